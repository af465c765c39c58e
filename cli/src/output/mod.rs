//! CLI-specific output implementations
//!
//! Terminal rendering of run events: a spinner for the current iteration and
//! one line per tool execution.

pub mod cli_handler;

pub use cli_handler::{CliOutputConfig, CliOutputHandler};
