//! Filesystem discovery of Python modules.
//!
//! Two entry points mirror the two ways a module tree is rooted:
//! [`find_search_path_modules`] treats a directory like an entry on
//! `sys.path` (its immediate children are top-level modules), while
//! [`find_package_modules`] takes a package directory or a single `.py`
//! file and names modules relative to the *parent* of that path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::base::{is_identifier, validate_import_path};

/// Discovery failed before any module could be produced.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("search path is not a directory: {0:?}")]
    NotADirectory(PathBuf),
    #[error("package path does not exist: {0:?}")]
    NotFound(PathBuf),
    #[error("package path is not a python module or package: {0:?}")]
    NotAPackage(PathBuf),
    #[error("cannot derive a module name from path: {0:?}")]
    UnnamablePath(PathBuf),
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A single discovered Python module file.
///
/// Records are immutable once constructed; identity is the full set of
/// fields, so two scans of the same file compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRecord {
    name: String,
    path: PathBuf,
    origin: SmolStr,
    is_package: bool,
}

impl ModuleRecord {
    /// Build a record for the file at `root.join(subpath)`.
    ///
    /// The dotted name is derived from `subpath`; a trailing `__init__.py`
    /// names the containing directory and marks the record as a package.
    pub fn from_root_and_subpath(
        root: &Path,
        subpath: &Path,
        origin: &str,
    ) -> Result<Self, DiscoveryError> {
        let mut parts: Vec<&str> = Vec::new();
        for component in subpath.components() {
            let Some(part) = component.as_os_str().to_str() else {
                return Err(DiscoveryError::UnnamablePath(subpath.to_path_buf()));
            };
            parts.push(part);
        }
        let Some(last) = parts.pop() else {
            return Err(DiscoveryError::UnnamablePath(subpath.to_path_buf()));
        };
        let mut is_package = false;
        match last.strip_suffix(".py") {
            Some("__init__") => is_package = true,
            Some(stem) => parts.push(stem),
            None => return Err(DiscoveryError::NotAPackage(subpath.to_path_buf())),
        }
        let name = parts.join(".");
        if validate_import_path(&name).is_err() {
            return Err(DiscoveryError::UnnamablePath(subpath.to_path_buf()));
        }
        Ok(Self {
            name,
            path: root.join(subpath),
            origin: SmolStr::new(origin),
            is_package,
        })
    }

    /// Dotted import path of the module, e.g. `"pkg.sub.mod"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute or root-relative path of the backing `.py` file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tag identifying which scope or search path produced this record.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Whether the record is a package `__init__.py`.
    pub fn is_package(&self) -> bool {
        self.is_package
    }
}

/// Walk `walk_root` for `*.py` files, naming each module relative to
/// `name_root` (an ancestor of `walk_root`).
fn walk_py_files(
    walk_root: &Path,
    name_root: &Path,
    origin: &str,
) -> Result<Vec<Arc<ModuleRecord>>, DiscoveryError> {
    let mut records = Vec::new();
    for entry in WalkDir::new(walk_root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "py") {
            continue;
        }
        let Ok(subpath) = path.strip_prefix(name_root) else {
            continue;
        };
        match ModuleRecord::from_root_and_subpath(name_root, subpath, origin) {
            Ok(record) => records.push(Arc::new(record)),
            Err(DiscoveryError::UnnamablePath(_)) => {
                debug!(path = %path.display(), "skipping file with non-identifier path component");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(records)
}

/// Discover all modules below a `sys.path`-style search directory.
///
/// Every `*.py` file whose path components are valid identifiers becomes a
/// module named relative to `search_path`. Files under directories with
/// non-identifier names are skipped with a debug log.
pub fn find_search_path_modules(
    search_path: &Path,
    origin: &str,
) -> Result<Vec<Arc<ModuleRecord>>, DiscoveryError> {
    if !search_path.is_dir() {
        return Err(DiscoveryError::NotADirectory(search_path.to_path_buf()));
    }
    walk_py_files(search_path, search_path, origin)
}

/// Discover the modules of a single package directory or module file.
///
/// For a directory `a/b/pkg`, modules are named `pkg`, `pkg.x`, and so on;
/// for a file `a/b/mod.py` a single module `mod` is produced.
pub fn find_package_modules(
    pkg_path: &Path,
    origin: &str,
) -> Result<Vec<Arc<ModuleRecord>>, DiscoveryError> {
    if !pkg_path.exists() {
        return Err(DiscoveryError::NotFound(pkg_path.to_path_buf()));
    }
    let Some(root) = pkg_path.parent() else {
        return Err(DiscoveryError::NotAPackage(pkg_path.to_path_buf()));
    };
    if pkg_path.is_file() {
        let Some(stem) = pkg_path.file_stem().and_then(|s| s.to_str()) else {
            return Err(DiscoveryError::UnnamablePath(pkg_path.to_path_buf()));
        };
        if pkg_path.extension().is_none_or(|ext| ext != "py") || !is_identifier(stem) {
            return Err(DiscoveryError::NotAPackage(pkg_path.to_path_buf()));
        }
        let subpath = pkg_path.strip_prefix(root).map_err(|_| {
            DiscoveryError::UnnamablePath(pkg_path.to_path_buf())
        })?;
        let record = ModuleRecord::from_root_and_subpath(root, subpath, origin)?;
        return Ok(vec![Arc::new(record)]);
    }
    let Some(pkg_name) = pkg_path.file_name().and_then(|s| s.to_str()) else {
        return Err(DiscoveryError::UnnamablePath(pkg_path.to_path_buf()));
    };
    if !is_identifier(pkg_name) {
        return Err(DiscoveryError::NotAPackage(pkg_path.to_path_buf()));
    }
    walk_py_files(pkg_path, root, origin)
}
