//! Error types and handling for appgen core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for appgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for appgen core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// LLM client errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Trajectory recording errors
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),

    /// Prompt template errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },
}

/// LLM client errors
///
/// Every variant is a transport-level failure from the loop's point of view:
/// the model did not produce a response we can parse.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Model call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Tool-level errors
///
/// These never terminate a run. The executor folds them into a failed
/// `ToolResult` so the model can correct itself on the next iteration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },
}

/// Machine-readable kind of a tool failure, carried on failed results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailure {
    UnknownTool,
    InvalidArguments,
    InvalidPath,
    NotFound,
}

impl ToolError {
    /// Classify this error for a `ToolResult`
    pub fn failure_kind(&self) -> ToolFailure {
        match self {
            ToolError::UnknownTool { .. } | ToolError::DuplicateTool { .. } => {
                ToolFailure::UnknownTool
            }
            ToolError::InvalidArguments { .. } => ToolFailure::InvalidArguments,
            ToolError::InvalidPath { .. } => ToolFailure::InvalidPath,
            ToolError::NotFound { .. } => ToolFailure::NotFound,
        }
    }
}

/// Trajectory recording errors
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("Failed to record trajectory: {message}")]
    RecordingFailed { message: String },

    #[error("Failed to load trajectory: {path}")]
    LoadFailed { path: String },

    #[error("Invalid trajectory format")]
    InvalidFormat,
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_failure_kind() {
        let err = ToolError::InvalidPath {
            path: "../x".to_string(),
            reason: "escapes the workspace root".to_string(),
        };
        assert_eq!(err.failure_kind(), ToolFailure::InvalidPath);
        assert_eq!(
            err.to_string(),
            "Invalid path '../x': escapes the workspace root"
        );

        let err = ToolError::UnknownTool {
            name: "deploy".to_string(),
        };
        assert_eq!(err.failure_kind(), ToolFailure::UnknownTool);
    }

    #[test]
    fn test_tool_error_converts_into_error() {
        let err: Error = ToolError::NotFound {
            path: "app.py".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Tool(ToolError::NotFound { .. })));
        assert_eq!(err.to_string(), "Tool error: File not found: app.py");
    }
}
