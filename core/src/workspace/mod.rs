//! Workspace Store: the in-memory record of every generated file

pub mod path;

use crate::error::ToolError;
use serde::Serialize;
use std::collections::HashMap;

pub use path::normalize;

/// A generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceFile {
    pub path: String,
    pub content: String,
}

/// What a write did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    Created,
    Updated,
    Unchanged,
}

/// Mapping from normalized path to file, kept in first-write order
///
/// Owned by exactly one run. The tool executor is the only writer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Workspace {
    files: Vec<WorkspaceFile>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a file; last write wins, position is kept from the first write
    pub fn put(&mut self, path: &str, content: String) -> Result<(String, WriteStatus), ToolError> {
        let normalized = normalize(path)?;

        let status = match self.index.get(&normalized) {
            Some(&slot) => {
                let file = &mut self.files[slot];
                if file.content == content {
                    WriteStatus::Unchanged
                } else {
                    file.content = content;
                    WriteStatus::Updated
                }
            }
            None => {
                self.check_no_file_dir_clash(&normalized)?;
                self.index.insert(normalized.clone(), self.files.len());
                self.files.push(WorkspaceFile {
                    path: normalized.clone(),
                    content,
                });
                WriteStatus::Created
            }
        };

        Ok((normalized, status))
    }

    /// A new path may not sit under an existing file, nor be a directory of one
    fn check_no_file_dir_clash(&self, normalized: &str) -> Result<(), ToolError> {
        let clash = self.files.iter().find(|file| {
            is_parent_dir(&file.path, normalized) || is_parent_dir(normalized, &file.path)
        });
        match clash {
            Some(file) => Err(ToolError::InvalidPath {
                path: normalized.to_string(),
                reason: format!("conflicts with existing file '{}'", file.path),
            }),
            None => Ok(()),
        }
    }

    /// Overwrite a file that already exists
    pub fn update(
        &mut self,
        path: &str,
        content: String,
    ) -> Result<(String, WriteStatus), ToolError> {
        let normalized = normalize(path)?;
        if !self.index.contains_key(&normalized) {
            return Err(ToolError::NotFound { path: normalized });
        }
        self.put(&normalized, content)
    }

    pub fn get(&self, path: &str) -> Result<&str, ToolError> {
        let normalized = normalize(path)?;
        self.index
            .get(&normalized)
            .map(|&slot| self.files[slot].content.as_str())
            .ok_or(ToolError::NotFound { path: normalized })
    }

    pub fn contains(&self, path: &str) -> bool {
        normalize(path)
            .map(|p| self.index.contains_key(&p))
            .unwrap_or(false)
    }

    /// Paths in insertion order
    pub fn list(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn files(&self) -> &[WorkspaceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }
}

/// Whether `dir` names a directory that contains `path`
fn is_parent_dir(dir: &str, path: &str) -> bool {
    path.strip_prefix(dir)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

impl PartialEq for Workspace {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
    }
}

impl Eq for Workspace {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins_in_first_seen_order() {
        let mut ws = Workspace::new();
        ws.put("app.py", "v1".to_string()).unwrap();
        ws.put("templates/index.html", "<html>".to_string()).unwrap();
        let (_, status) = ws.put("./app.py", "v2".to_string()).unwrap();

        assert_eq!(status, WriteStatus::Updated);
        assert_eq!(ws.list(), vec!["app.py", "templates/index.html"]);
        assert_eq!(ws.get("app.py").unwrap(), "v2");
        assert_eq!(ws.total_bytes(), 8);
    }

    #[test]
    fn test_identical_write_is_unchanged() {
        let mut ws = Workspace::new();
        ws.put("app.py", "x".to_string()).unwrap();
        let before = ws.clone();
        let (_, status) = ws.put("app.py", "x".to_string()).unwrap();
        assert_eq!(status, WriteStatus::Unchanged);
        assert_eq!(ws, before);
    }

    #[test]
    fn test_escape_never_mutates() {
        let mut ws = Workspace::new();
        let err = ws.put("../escape.txt", "x".to_string()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidPath { .. }));
        assert!(ws.is_empty());
    }

    #[test]
    fn test_file_directory_clash_is_rejected() {
        let mut ws = Workspace::new();
        ws.put("static", "x".to_string()).unwrap();
        let err = ws.put("static/app.css", "body {}".to_string()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidPath { .. }));
        assert!(err.to_string().contains("conflicts with existing file 'static'"));

        let mut ws = Workspace::new();
        ws.put("static/css/app.css", "body {}".to_string()).unwrap();
        assert!(ws.put("static/css", "x".to_string()).is_err());
        assert!(ws.put("static", "x".to_string()).is_err());
        assert_eq!(ws.list(), vec!["static/css/app.css"]);

        // Shared name prefixes are not directories
        ws.put("static/css/app.css.map", "{}".to_string()).unwrap();
        ws.put("stat", "y".to_string()).unwrap();
        assert_eq!(ws.len(), 3);
    }

    #[test]
    fn test_get_and_update_missing() {
        let mut ws = Workspace::new();
        assert_eq!(
            ws.get("missing.html").unwrap_err(),
            ToolError::NotFound {
                path: "missing.html".to_string()
            }
        );
        assert!(ws.update("missing.html", String::new()).is_err());
        assert!(!ws.contains("missing.html"));
    }
}
