//! Workspace file tools: write, update, read and list

use super::ToolOutput;
use crate::error::ToolError;
use crate::tools::{ParameterSpec, ToolDefinition, ToolKind};
use crate::workspace::{WriteStatus, Workspace};
use serde_json::json;

pub fn write_file_definition() -> ToolDefinition {
    ToolDefinition {
        kind: ToolKind::WriteFile,
        name: ToolKind::WriteFile.name().to_string(),
        description: "Create or overwrite a file in the application workspace. \
                      The path is relative to the application root, for example \
                      `app.py`, `templates/index.html` or `static/css/style.css`. \
                      Always write the complete file content."
            .to_string(),
        parameters: vec![
            ParameterSpec::required_string(
                "path",
                "Relative file path inside the application root.",
            ),
            ParameterSpec::required_string("content", "The full content of the file."),
        ],
    }
}

pub fn update_file_definition() -> ToolDefinition {
    ToolDefinition {
        kind: ToolKind::UpdateFile,
        name: ToolKind::UpdateFile.name().to_string(),
        description: "Replace the content of a file that was already written. \
                      Fails if the file does not exist yet; use write_file to create it."
            .to_string(),
        parameters: vec![
            ParameterSpec::required_string("path", "Relative path of an existing file."),
            ParameterSpec::required_string("content", "The new full content of the file."),
        ],
    }
}

pub fn read_file_definition() -> ToolDefinition {
    ToolDefinition {
        kind: ToolKind::ReadFile,
        name: ToolKind::ReadFile.name().to_string(),
        description: "Return the current content of a file you have written, \
                      so you can review it before changing it."
            .to_string(),
        parameters: vec![ParameterSpec::required_string(
            "path",
            "Relative path of the file to read.",
        )],
    }
}

pub fn list_files_definition() -> ToolDefinition {
    ToolDefinition {
        kind: ToolKind::ListFiles,
        name: ToolKind::ListFiles.name().to_string(),
        description: "List the paths of every file written so far, in creation order.".to_string(),
        parameters: Vec::new(),
    }
}

pub fn write_file(
    workspace: &mut Workspace,
    path: &str,
    content: String,
) -> Result<ToolOutput, ToolError> {
    let bytes = content.len();
    let (normalized, status) = workspace.put(path, content)?;
    let verb = match status {
        WriteStatus::Created => "Created",
        WriteStatus::Updated | WriteStatus::Unchanged => "Updated",
    };
    Ok(
        ToolOutput::new(format!("{} file: {} ({} bytes)", verb, normalized, bytes)).with_data(
            json!({
                "path": normalized,
                "bytes": bytes,
                "status": status,
            }),
        ),
    )
}

pub fn update_file(
    workspace: &mut Workspace,
    path: &str,
    content: String,
) -> Result<ToolOutput, ToolError> {
    let bytes = content.len();
    let (normalized, status) = workspace.update(path, content)?;
    Ok(
        ToolOutput::new(format!("Updated file: {} ({} bytes)", normalized, bytes)).with_data(
            json!({
                "path": normalized,
                "bytes": bytes,
                "status": status,
            }),
        ),
    )
}

pub fn read_file(workspace: &Workspace, path: &str) -> Result<ToolOutput, ToolError> {
    let content = workspace.get(path)?;
    Ok(ToolOutput::new(content))
}

pub fn list_files(workspace: &Workspace) -> ToolOutput {
    let paths = workspace.list();
    let content = if paths.is_empty() {
        "No files have been written yet.".to_string()
    } else {
        paths.join("\n")
    };
    ToolOutput::new(content).with_data(json!({ "paths": paths }))
}
