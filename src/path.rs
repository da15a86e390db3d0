// src/path.rs

//! Path sanitization utilities
//!
//! Change paths come from source control and are applied relative to the
//! root of a target. Every path is normalized to a relative, `/`-separated
//! form before it reaches a backend, and anything that would climb out of
//! the root is rejected.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Normalize a relative target path
///
/// This function:
/// 1. Rejects paths containing `..` components
/// 2. Skips `.` components and empty segments
/// 3. Strips leading slashes
/// 4. Returns an error for empty paths
///
/// # Examples
///
/// ```
/// use stagehand::path::normalize;
///
/// assert_eq!(normalize("/a/./b//c.txt").unwrap(), "a/b/c.txt");
/// assert!(normalize("a/../../etc/passwd").is_err());
/// assert!(normalize("/").is_err());
/// ```
pub fn normalize(path: &str) -> Result<String> {
    let mut segments = Vec::new();

    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(Error::PathTraversal(path.to_string())),
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Empty path after normalization: '{}'",
            path
        )));
    }

    Ok(segments.join("/"))
}

/// Join a normalized base with a relative path
pub fn join(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base, path),
    }
}

/// Parent of a normalized path, `None` for top-level entries
pub fn parent(path: &str) -> Option<&str> {
    path.rfind('/').map(|pos| &path[..pos])
}

/// True if `path` is `ancestor` itself or lies beneath it
pub fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}

/// Safely join a local root directory with an untrusted relative path
pub fn safe_join(root: impl AsRef<Path>, path: &str) -> Result<PathBuf> {
    let root = root.as_ref();
    let normalized = normalize(path)?;
    let joined = root.join(&normalized);

    // Components of the normalized form are all Normal, so this only
    // trips on platform prefixes sneaking through
    if joined
        .strip_prefix(root)
        .map(|rel| rel.components().any(|c| !matches!(c, Component::Normal(_))))
        .unwrap_or(true)
    {
        return Err(Error::PathTraversal(format!(
            "Path {} escapes root {}",
            path,
            root.display()
        )));
    }

    Ok(joined)
}
