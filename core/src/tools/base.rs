//! Base tool structures: invocations, typed actions and results

use crate::error::{ToolError, ToolFailure};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The closed set of tool kinds the model can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WriteFile,
    UpdateFile,
    ReadFile,
    ListFiles,
    Finish,
}

impl ToolKind {
    /// All kinds, in manifest order
    pub const ALL: [ToolKind; 5] = [
        ToolKind::WriteFile,
        ToolKind::UpdateFile,
        ToolKind::ReadFile,
        ToolKind::ListFiles,
        ToolKind::Finish,
    ];

    /// Name the model uses to call this tool
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WriteFile => "write_file",
            ToolKind::UpdateFile => "update_file",
            ToolKind::ReadFile => "read_file",
            ToolKind::ListFiles => "list_files",
            ToolKind::Finish => "finish",
        }
    }

    /// Whether a successful invocation of this kind mutates the workspace
    pub fn is_write(&self) -> bool {
        matches!(self, ToolKind::WriteFile | ToolKind::UpdateFile)
    }
}

/// A call to a tool, as proposed by the model for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Unique identifier for this call (provider-assigned when available)
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments to pass to the tool
    pub arguments: Value,
}

impl ToolInvocation {
    /// Create a new invocation with a generated id
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a new invocation with a known id
    pub fn with_id<S: Into<String>>(id: S, name: S, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// The `path` argument, when present; used for progress display
    pub fn target_path(&self) -> Option<&str> {
        self.arguments.get("path").and_then(Value::as_str)
    }
}

/// A validated, typed tool action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    WriteFile { path: String, content: String },
    UpdateFile { path: String, content: String },
    ReadFile { path: String },
    ListFiles,
    Finish { summary: String },
}

impl ToolAction {
    /// Build the typed action from arguments that already passed schema validation
    pub fn from_arguments(kind: ToolKind, args: &Map<String, Value>) -> Result<Self, ToolError> {
        let action = match kind {
            ToolKind::WriteFile => ToolAction::WriteFile {
                path: string_arg(kind, args, "path")?,
                content: string_arg(kind, args, "content")?,
            },
            ToolKind::UpdateFile => ToolAction::UpdateFile {
                path: string_arg(kind, args, "path")?,
                content: string_arg(kind, args, "content")?,
            },
            ToolKind::ReadFile => ToolAction::ReadFile {
                path: string_arg(kind, args, "path")?,
            },
            ToolKind::ListFiles => ToolAction::ListFiles,
            ToolKind::Finish => ToolAction::Finish {
                summary: string_arg(kind, args, "summary")?,
            },
        };
        Ok(action)
    }
}

fn string_arg(kind: ToolKind, args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: kind.name().to_string(),
            message: format!("'{}' must be a string", key),
        })
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is a result for
    pub tool_call_id: String,

    /// Name of the tool that was called
    pub tool_name: String,

    /// Whether the execution was successful
    pub success: bool,

    /// Result content, fed back to the model verbatim
    pub content: String,

    /// Optional structured data
    pub data: Option<Value>,

    /// Failure kind, set only when `success` is false
    pub failure: Option<ToolFailure>,

    /// Registry kind the tool name resolved to; `None` for unknown tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ToolKind>,

    /// Execution duration in milliseconds
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success<S: Into<String>>(tool_call_id: S, tool_name: S, content: S) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            success: true,
            content: content.into(),
            data: None,
            failure: None,
            kind: None,
            duration_ms: None,
        }
    }

    /// Create an error result from a tool error
    pub fn error<S: Into<String>>(tool_call_id: S, tool_name: S, error: &ToolError) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            success: false,
            content: format!("Error: {}", error),
            data: None,
            failure: Some(error.failure_kind()),
            kind: None,
            duration_ms: None,
        }
    }

    /// Set structured data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Record the kind the tool resolved to
    pub fn with_kind(mut self, kind: Option<ToolKind>) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this is a successful workspace write
    pub fn is_successful_write(&self) -> bool {
        self.success && self.kind.map(|kind| kind.is_write()).unwrap_or(false)
    }

    /// Set execution duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_from_arguments() {
        let args = json!({"path": "app.py", "content": "x"});
        let action =
            ToolAction::from_arguments(ToolKind::WriteFile, args.as_object().unwrap()).unwrap();
        assert_eq!(
            action,
            ToolAction::WriteFile {
                path: "app.py".to_string(),
                content: "x".to_string()
            }
        );
    }

    #[test]
    fn test_action_rejects_non_string() {
        let args = json!({"summary": 42});
        let err =
            ToolAction::from_arguments(ToolKind::Finish, args.as_object().unwrap()).unwrap_err();
        assert_eq!(err.failure_kind(), ToolFailure::InvalidArguments);
    }

    #[test]
    fn test_error_result_carries_failure_kind() {
        let err = ToolError::NotFound {
            path: "missing.html".to_string(),
        };
        let result = ToolResult::error("call_1", "read_file", &err);
        assert!(!result.success);
        assert_eq!(result.failure, Some(ToolFailure::NotFound));
        assert_eq!(result.content, "Error: File not found: missing.html");
    }
}
