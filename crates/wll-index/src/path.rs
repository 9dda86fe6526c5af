//! Repository-relative path helpers.
//!
//! Index paths are `/`-separated and relative to the repository root. A
//! directory prefix never carries a trailing slash; the empty prefix denotes
//! the repository root and contains every path.

use crate::error::{IndexError, IndexResult};

/// Check that `path` is a well-formed index path.
pub fn validate(path: &str) -> IndexResult<()> {
    if path.is_empty() {
        return Err(IndexError::InvalidPath("empty path".to_string()));
    }
    if path.contains('\\') {
        return Err(IndexError::InvalidPath(format!("backslash in path: {path}")));
    }
    for component in path.split('/') {
        match component {
            "" => return Err(IndexError::InvalidPath(format!("empty component in: {path}"))),
            "." | ".." => {
                return Err(IndexError::InvalidPath(format!("relative component in: {path}")))
            }
            _ => {}
        }
    }
    Ok(())
}

/// The part of `path` below directory `prefix`, or `None` if `path` is not
/// strictly inside it. `"src"` contains `"src/a.txt"` but not `"src"` itself
/// and not `"srcfoo/a.txt"`.
pub fn strip_dir_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix)?.strip_prefix('/')
}

/// Returns `true` if `path` lies inside directory `prefix`.
pub fn is_within(path: &str, prefix: &str) -> bool {
    strip_dir_prefix(path, prefix).is_some()
}

/// Join a directory prefix and a relative suffix.
pub fn join(prefix: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{prefix}/{suffix}")
    }
}
