//! Agent loop: configuration, controller, response parsing and prompts

pub mod config;
pub mod core;
pub mod execution;
pub mod parser;
pub mod prompt;

pub use config::{AgentBuilder, AgentConfig};
pub use self::core::AgentCore;
pub use execution::{FailureReason, LoopState, RunOutcome, RunRequest, RunStatus};
pub use parser::{parse_response, MalformedResponse, ParsedResponse};
pub use prompt::{build_system_prompt, build_user_message, APP_BUILDER_GUIDANCE};
