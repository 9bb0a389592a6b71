//! Dotted import-path validation and filesystem path helpers.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A dotted import path (or one of its components) failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid import path {path:?}: {reason}")]
pub struct InvalidImportPath {
    pub path: String,
    pub reason: String,
}

/// Python's `str.isidentifier` equivalent.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if unicode_ident::is_xid_start(c) || c == '_' => {}
        _ => return false,
    }
    chars.all(unicode_ident::is_xid_continue)
}

/// Check that every dot-separated component of `path` is a valid identifier.
pub fn validate_import_path(path: &str) -> Result<&str, InvalidImportPath> {
    if path.is_empty() {
        return Err(InvalidImportPath {
            path: path.to_owned(),
            reason: "import path must not be empty".to_owned(),
        });
    }
    for part in path.split('.') {
        if !is_identifier(part) {
            return Err(InvalidImportPath {
                path: path.to_owned(),
                reason: format!("component {part:?} is not a valid identifier"),
            });
        }
    }
    Ok(path)
}

/// Origin tags allow hyphens (project names often do); otherwise identifier rules.
pub fn validate_origin_tag(tag: &str) -> Result<&str, InvalidImportPath> {
    if tag.is_empty() || !is_identifier(&tag.replace('-', "_")) {
        return Err(InvalidImportPath {
            path: tag.to_owned(),
            reason: "origin tag must be a valid identifier (hyphens allowed)".to_owned(),
        });
    }
    Ok(tag)
}

/// The leading component of a dotted path (`"a.b.c"` -> `"a"`).
pub fn root_component(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// The dotted path minus its last component, or `None` for a top-level name.
pub fn parent_import_path(path: &str) -> Option<&str> {
    path.rfind('.').map(|idx| &path[..idx])
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve_under_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
