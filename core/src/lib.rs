//! # appgen Core
//!
//! Core library for appgen: turns a natural-language application description
//! into a multi-file web application by driving a language model through a
//! bounded tool-use loop.
//!
//! The loop owns an in-memory [`workspace::Workspace`] and an append-only
//! [`conversation::Conversation`] per run. Nothing touches the filesystem
//! until the caller materializes the final workspace.

// Core modules
pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod output;
pub mod tools;
pub mod trajectory;
pub mod workspace;

// Re-export commonly used types
pub use agent::{
    AgentBuilder, AgentConfig, AgentCore, FailureReason, RunOutcome, RunRequest, RunStatus,
};
pub use config::{ModelParams, Protocol, ResolvedLlmConfig};
pub use conversation::{Conversation, Turn};
pub use error::{Error, Result};
pub use tools::{ToolRegistry, ToolResult};
pub use trajectory::TrajectoryRecorder;
pub use workspace::{Workspace, WorkspaceFile};

/// Current version of the appgen-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing with a debug or info default; `RUST_LOG` still wins
pub fn init_tracing_with_debug(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
