//! Build completion tool

use super::ToolOutput;
use crate::tools::{ParameterSpec, ToolDefinition, ToolKind};
use crate::workspace::Workspace;
use serde_json::json;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        kind: ToolKind::Finish,
        name: ToolKind::Finish.name().to_string(),
        description: "Mark the build as complete. Call this only once every file of the \
                      application is written and reviewed. This ends the session."
            .to_string(),
        parameters: vec![ParameterSpec::required_string(
            "summary",
            "Short summary of the application that was built.",
        )],
    }
}

pub fn finish(workspace: &Workspace, summary: String) -> ToolOutput {
    ToolOutput::new(format!(
        "Build marked as complete with {} files. Summary: {}",
        workspace.len(),
        summary
    ))
    .with_data(json!({
        "completed": true,
        "summary": summary,
        "files": workspace.len(),
    }))
}
