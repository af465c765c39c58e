//! Workspace path normalization
//!
//! Paths are relative, `/`-separated and must stay inside the workspace
//! root. Anything ambiguous is rejected instead of being resolved.

use crate::error::ToolError;

/// Normalize a model-supplied relative path
///
/// `.` segments are dropped. Absolute paths, drive prefixes, backslashes,
/// `..`, `~`, empty segments and directory-like trailing slashes are
/// rejected with `InvalidPath`.
pub fn normalize(path: &str) -> Result<String, ToolError> {
    let reject = |reason: &str| ToolError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(reject("path is empty"));
    }
    if path.trim() != path {
        return Err(reject("path has leading or trailing whitespace"));
    }
    if path.contains('\0') {
        return Err(reject("path contains a NUL character"));
    }
    if path.contains('\\') {
        return Err(reject("use '/' as the path separator"));
    }
    if path.starts_with('/') {
        return Err(reject("path must be relative to the application root"));
    }
    if has_drive_prefix(path) {
        return Err(reject("path must not carry a drive prefix"));
    }
    if path.ends_with('/') {
        return Err(reject("path names a directory, not a file"));
    }

    let mut segments = Vec::new();
    for (index, segment) in path.split('/').enumerate() {
        match segment {
            "" => return Err(reject("path contains an empty segment")),
            "." => continue,
            ".." => return Err(reject("path escapes the workspace root")),
            "~" if index == 0 => return Err(reject("home-relative paths are not allowed")),
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(reject("path does not name a file"));
    }

    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_relative_paths() {
        assert_eq!(normalize("app.py").unwrap(), "app.py");
        assert_eq!(
            normalize("static/css/style.css").unwrap(),
            "static/css/style.css"
        );
        assert_eq!(normalize("./templates/./index.html").unwrap(), "templates/index.html");
        assert_eq!(normalize(".env").unwrap(), ".env");
    }

    #[test]
    fn test_rejects_escapes_and_ambiguity() {
        let rejected = [
            "",
            " app.py",
            "../escape.txt",
            "templates/../../x",
            "/etc/passwd",
            "C:/app.py",
            "templates\\index.html",
            "templates//index.html",
            "templates/",
            "~/x",
            ".",
            "./.",
            "a\0b",
        ];
        for path in rejected {
            let err = normalize(path).unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidPath { .. }),
                "expected InvalidPath for {:?}",
                path
            );
        }
    }

    #[test]
    fn test_parent_segment_inside_root_is_still_rejected() {
        // Resolvable in principle, but ambiguous for the audit log
        assert!(normalize("templates/../app.py").is_err());
    }
}
