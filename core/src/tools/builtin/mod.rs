//! Built-in tools
//!
//! Each tool kind has a declaration (`definition`) and an implementation
//! (`run`). Dispatch is an exhaustive match over [`ToolAction`].

pub mod files;
pub mod finish;

use crate::error::ToolError;
use crate::tools::{ToolAction, ToolDefinition, ToolKind};
use crate::workspace::Workspace;
use serde_json::Value;

/// Output of a successful tool run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Declaration of a built-in tool
pub fn definition(kind: ToolKind) -> ToolDefinition {
    match kind {
        ToolKind::WriteFile => files::write_file_definition(),
        ToolKind::UpdateFile => files::update_file_definition(),
        ToolKind::ReadFile => files::read_file_definition(),
        ToolKind::ListFiles => files::list_files_definition(),
        ToolKind::Finish => finish::definition(),
    }
}

/// Apply a typed action to the workspace
pub fn run(action: ToolAction, workspace: &mut Workspace) -> Result<ToolOutput, ToolError> {
    match action {
        ToolAction::WriteFile { path, content } => files::write_file(workspace, &path, content),
        ToolAction::UpdateFile { path, content } => files::update_file(workspace, &path, content),
        ToolAction::ReadFile { path } => files::read_file(workspace, &path),
        ToolAction::ListFiles => Ok(files::list_files(workspace)),
        ToolAction::Finish { summary } => Ok(finish::finish(workspace, summary)),
    }
}
