//! Writes a finished workspace to disk

use anyhow::{Context, Result};
use appgen_core::workspace::normalize;
use appgen_core::Workspace;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Package marker added when route handlers are generated without one
const ROUTES_PACKAGE_MARKER: &str = "routes/__init__.py";

/// What a materialization wrote
#[derive(Debug, Clone, Default)]
pub struct MaterializeReport {
    /// Files written, relative to the output root, in workspace order
    pub written: Vec<String>,
    /// Files the materializer added on its own
    pub added: Vec<String>,
}

impl MaterializeReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.added.len()
    }
}

/// Write every workspace file under `root`, creating directories as needed
pub fn materialize(workspace: &Workspace, root: &Path) -> Result<MaterializeReport> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create output directory: {}", root.display()))?;

    let mut report = MaterializeReport::default();

    for file in workspace.files() {
        let target = resolve(root, &file.path)?;
        write_file(&target, &file.content)?;
        debug!("wrote {}", target.display());
        report.written.push(file.path.clone());
    }

    let has_routes = workspace.list().iter().any(|p| p.starts_with("routes/"));
    if has_routes && !workspace.contains(ROUTES_PACKAGE_MARKER) {
        let target = resolve(root, ROUTES_PACKAGE_MARKER)?;
        write_file(&target, "")?;
        report.added.push(ROUTES_PACKAGE_MARKER.to_string());
    }

    info!(
        "materialized {} files under {}",
        report.total(),
        root.display()
    );
    Ok(report)
}

/// Map a workspace path onto the output root, refusing anything that escapes it
fn resolve(root: &Path, path: &str) -> Result<PathBuf> {
    let normalized = normalize(path).with_context(|| format!("Refusing to write '{}'", path))?;
    let mut target = root.to_path_buf();
    for segment in normalized.split('/') {
        target.push(segment);
    }
    Ok(target)
}

fn write_file(target: &Path, content: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(target, content)
        .with_context(|| format!("Failed to write file: {}", target.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace(files: &[(&str, &str)]) -> Workspace {
        let mut ws = Workspace::new();
        for (path, content) in files {
            ws.put(path, content.to_string()).unwrap();
        }
        ws
    }

    #[test]
    fn test_materialize_writes_nested_files() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&[
            ("app.py", "from flask import Flask"),
            ("templates/index.html", "<h1>Todo</h1>"),
            ("static/css/style.css", "body {}"),
        ]);

        let report = materialize(&ws, dir.path()).unwrap();
        assert_eq!(report.written.len(), 3);
        assert!(report.added.is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("templates/index.html")).unwrap(),
            "<h1>Todo</h1>"
        );
        assert!(dir.path().join("static/css/style.css").is_file());
    }

    #[test]
    fn test_routes_package_marker_is_added() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&[("app.py", "x"), ("routes/main.py", "y")]);

        let report = materialize(&ws, dir.path()).unwrap();
        assert_eq!(report.added, vec![ROUTES_PACKAGE_MARKER.to_string()]);
        assert_eq!(report.total(), 3);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("routes/__init__.py")).unwrap(),
            ""
        );
    }

    #[test]
    fn test_existing_routes_marker_is_kept() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&[("routes/__init__.py", "from . import main"), ("routes/main.py", "y")]);

        let report = materialize(&ws, dir.path()).unwrap();
        assert!(report.added.is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("routes/__init__.py")).unwrap(),
            "from . import main"
        );
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let dir = TempDir::new().unwrap();
        assert!(resolve(dir.path(), "../outside.txt").is_err());
        assert!(resolve(dir.path(), "/etc/passwd").is_err());
        assert_eq!(
            resolve(dir.path(), "./a/b.txt").unwrap(),
            dir.path().join("a").join("b.txt")
        );
    }
}
