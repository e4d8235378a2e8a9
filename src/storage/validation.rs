//! Path validation
//!
//! Resolves user-supplied relative paths against the storage root and
//! validates entry names before they are placed into a directory.

use std::path::{Component, Path, PathBuf};

use crate::error::{GatewayError, GatewayResult};

/// Resolves `user_path` beneath `root`, rejecting anything that escapes it.
///
/// `root` must already be absolute and normalized. A missing or empty path
/// means the root itself. The check is lexical: `..` segments and absolute
/// overrides are folded before containment is tested, symbolic links are
/// not followed.
pub fn resolve(root: &Path, user_path: Option<&str>) -> GatewayResult<PathBuf> {
    let user_path = match user_path {
        Some(p) if !p.is_empty() => p,
        _ => ".",
    };

    // join() replaces the base when the user path is absolute
    let resolved = normalize(&root.join(user_path));

    if !resolved.starts_with(root) {
        return Err(GatewayError::PathEscape(user_path.to_string()));
    }

    Ok(resolved)
}

/// Folds `.` and `..` components without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

/// Checks that a required field is present and non-empty
pub fn require<'a>(value: Option<&'a str>, field: &str) -> GatewayResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GatewayError::validation(format!("{field} required"))),
    }
}

/// Validates that `name` is a single directory entry name
pub fn validate_name(name: &str) -> GatewayResult<&str> {
    if name.is_empty() {
        return Err(GatewayError::validation("name required"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(GatewayError::validation(format!("Invalid name: {name}")));
    }
    Ok(name)
}
