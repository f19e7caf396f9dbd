use crate::{VfsError, VfsResult};

/// Normalise a namespace path.
///
/// Backslashes are treated as separators, empty and `.` components are
/// dropped and `..` pops the previous component. Leading `..` components that
/// cannot be popped are kept, so callers can detect paths escaping the root
/// with [`escapes_root`]. The root is the empty string.
#[must_use]
pub fn sanitize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {},
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            },
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Whether a sanitised path points above the namespace root.
#[must_use]
pub fn escapes_root(sanitized: &str) -> bool {
    sanitized == ".." || sanitized.starts_with("../")
}

/// Sanitise a path and reject it if it escapes the root.
///
/// # Errors
///
/// Returns [`VfsError::InvalidPath`] for paths above the root.
pub fn resolve(path: &str) -> VfsResult<String> {
    let sanitized = sanitize(path);
    if escapes_root(&sanitized) {
        return Err(VfsError::InvalidPath(path.to_owned()));
    }
    Ok(sanitized)
}

/// If `path` lies at or below `location`, the remainder relative to it.
#[must_use]
pub fn strip_location<'a>(path: &'a str, location: &str) -> Option<&'a str> {
    if location.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(location)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}
