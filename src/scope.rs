//! Module scopes: named collections of discovered modules.
//!
//! A [`ModuleScope`] is built from one or more search paths and package
//! paths, merged with other scopes, and narrowed with [`ModuleScope::restrict`].
//! Every mutating operation either succeeds fully or leaves the scope
//! untouched, so a failed merge never produces a half-populated scope.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::base::{parent_import_path, root_component, validate_import_path, validate_origin_tag};
use crate::scan::{DiscoveryError, ModuleRecord, find_package_modules, find_search_path_modules};

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("duplicate module paths: {paths:?}")]
    DuplicateModulePaths { paths: Vec<PathBuf> },
    #[error("duplicate module names: {names:?}")]
    DuplicateModuleNames { names: Vec<String> },
    #[error("unreachable module found: {name} from root: {root}")]
    UnreachableModule { name: String, root: String },
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    InvalidPath(#[from] crate::base::InvalidImportPath),
}

/// What to do with modules whose parent package is not importable, e.g. a
/// `pkg/sub/mod.py` where `pkg/sub/` has no `__init__.py`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreachableMode {
    /// Fail module discovery.
    #[default]
    Error,
    /// Drop the unreachable modules, logging each one.
    Skip,
    /// Keep them as if they were importable.
    Keep,
}

/// How restrict anchors select modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictMode {
    /// Only the anchors themselves.
    Exact,
    /// The anchors and everything nested beneath them.
    Children,
    /// Everything sharing a top-level root with any anchor.
    RootChildren,
}

/// Whether the selected modules are kept or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictOp {
    Limit,
    Exclude,
}

/// An ordered collection of module records, indexed by name and by path.
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    nodes: IndexMap<String, Arc<ModuleRecord>>,
    paths: FxHashMap<PathBuf, String>,
}

impl ModuleScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn get_record(&self, name: &str) -> Option<&Arc<ModuleRecord>> {
        self.nodes.get(name)
    }

    /// Module names in insertion order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter_records(&self) -> impl Iterator<Item = &Arc<ModuleRecord>> {
        self.nodes.values()
    }

    /// Discover modules under a `sys.path`-style directory and add them.
    ///
    /// With no `tag`, the directory name is used as the origin tag.
    pub fn add_from_search_path(
        &mut self,
        search_path: &Path,
        tag: Option<&str>,
        unreachable: UnreachableMode,
    ) -> Result<(), ScopeError> {
        let tag = self.derive_tag(search_path, tag)?;
        let records = find_search_path_modules(search_path, &tag)?;
        self.add_modules(records, unreachable)
    }

    /// Discover the modules of one package (directory or `.py` file) and add
    /// them.
    pub fn add_from_package_path(
        &mut self,
        pkg_path: &Path,
        tag: Option<&str>,
        unreachable: UnreachableMode,
    ) -> Result<(), ScopeError> {
        let tag = self.derive_tag(pkg_path, tag)?;
        let records = find_package_modules(pkg_path, &tag)?;
        self.add_modules(records, unreachable)
    }

    fn derive_tag(&self, path: &Path, tag: Option<&str>) -> Result<String, ScopeError> {
        match tag {
            Some(tag) => Ok(validate_origin_tag(tag)?.to_owned()),
            None => {
                let derived = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unknown")
                    .replace('-', "_");
                warn!(path = %path.display(), tag = %derived, "no origin tag given, derived one from the path");
                Ok(derived)
            }
        }
    }

    /// Add a batch of records, checking the batch and the existing scope for
    /// collisions before anything is inserted.
    pub fn add_modules(
        &mut self,
        records: Vec<Arc<ModuleRecord>>,
        unreachable: UnreachableMode,
    ) -> Result<(), ScopeError> {
        let records = apply_unreachable(records, unreachable)?;

        let mut seen_paths: FxHashSet<&Path> =
            self.paths.keys().map(PathBuf::as_path).collect();
        let mut dup_paths = Vec::new();
        for record in &records {
            if !seen_paths.insert(record.path()) {
                dup_paths.push(record.path().to_path_buf());
            }
        }
        if !dup_paths.is_empty() {
            return Err(ScopeError::DuplicateModulePaths { paths: dup_paths });
        }

        let mut seen_names: FxHashSet<&str> =
            self.nodes.keys().map(String::as_str).collect();
        let mut dup_names = Vec::new();
        for record in &records {
            if !seen_names.insert(record.name()) {
                dup_names.push(record.name().to_owned());
            }
        }
        if !dup_names.is_empty() {
            return Err(ScopeError::DuplicateModuleNames { names: dup_names });
        }

        for record in records {
            self.paths
                .insert(record.path().to_path_buf(), record.name().to_owned());
            self.nodes.insert(record.name().to_owned(), record);
        }
        Ok(())
    }

    /// Merge the contents of `other` into `self`.
    ///
    /// Fails without mutating if the two scopes share any module name or
    /// backing path.
    pub fn merge(&mut self, other: &ModuleScope) -> Result<(), ScopeError> {
        let dup_paths: Vec<PathBuf> = other
            .paths
            .keys()
            .filter(|path| self.paths.contains_key(*path))
            .cloned()
            .collect();
        if !dup_paths.is_empty() {
            return Err(ScopeError::DuplicateModulePaths { paths: dup_paths });
        }
        let dup_names = self.conflicting_names(other);
        if !dup_names.is_empty() {
            return Err(ScopeError::DuplicateModuleNames { names: dup_names });
        }
        for (name, record) in &other.nodes {
            self.paths
                .insert(record.path().to_path_buf(), name.clone());
            self.nodes.insert(name.clone(), record.clone());
        }
        Ok(())
    }

    /// A new scope with the anchor selection applied; `self` is untouched.
    ///
    /// Anchors are validated syntactically but need not name modules of
    /// the scope; an anchor matching nothing selects nothing, so
    /// restriction with a fixed anchor set is idempotent.
    pub fn restrict(
        &self,
        anchors: &[String],
        mode: RestrictMode,
        op: RestrictOp,
    ) -> Result<ModuleScope, ScopeError> {
        for anchor in anchors {
            validate_import_path(anchor)?;
        }
        let anchor_roots: FxHashSet<&str> = anchors
            .iter()
            .map(|anchor| root_component(anchor))
            .collect();
        let matches = |name: &str| -> bool {
            match mode {
                RestrictMode::Exact => anchors.iter().any(|anchor| anchor == name),
                RestrictMode::Children => anchors.iter().any(|anchor| {
                    name == anchor
                        || (name.len() > anchor.len()
                            && name.starts_with(anchor.as_str())
                            && name.as_bytes()[anchor.len()] == b'.')
                }),
                RestrictMode::RootChildren => anchor_roots.contains(root_component(name)),
            }
        };
        let keep = |name: &str| -> bool {
            match op {
                RestrictOp::Limit => matches(name),
                RestrictOp::Exclude => !matches(name),
            }
        };
        let mut restricted = ModuleScope::new();
        for (name, record) in &self.nodes {
            if keep(name) {
                restricted
                    .paths
                    .insert(record.path().to_path_buf(), name.clone());
                restricted.nodes.insert(name.clone(), record.clone());
            }
        }
        Ok(restricted)
    }

    /// Module names present in both scopes.
    pub fn conflicting_names(&self, other: &ModuleScope) -> Vec<String> {
        other
            .nodes
            .keys()
            .filter(|name| self.nodes.contains_key(*name))
            .cloned()
            .collect()
    }

    pub fn conflicts_with(&self, other: &ModuleScope) -> bool {
        !self.conflicting_names(other).is_empty()
    }

    pub fn is_subset_of(&self, other: &ModuleScope) -> bool {
        self.nodes.keys().all(|name| other.nodes.contains_key(name))
    }

    pub fn is_superset_of(&self, other: &ModuleScope) -> bool {
        other.is_subset_of(self)
    }

    pub fn is_equal(&self, other: &ModuleScope) -> bool {
        self.len() == other.len() && self.is_subset_of(other)
    }
}

/// Resolve unreachable modules within one discovery batch.
///
/// A module is reachable when it is top-level or its parent package was
/// discovered in the same batch and is itself reachable.
fn apply_unreachable(
    records: Vec<Arc<ModuleRecord>>,
    mode: UnreachableMode,
) -> Result<Vec<Arc<ModuleRecord>>, ScopeError> {
    if mode == UnreachableMode::Keep {
        return Ok(records);
    }
    let names: FxHashSet<String> = records
        .iter()
        .map(|record| record.name().to_owned())
        .collect();
    let mut reachable: FxHashMap<String, bool> = FxHashMap::default();
    fn is_reachable(
        name: &str,
        names: &FxHashSet<String>,
        reachable: &mut FxHashMap<String, bool>,
    ) -> bool {
        if let Some(&cached) = reachable.get(name) {
            return cached;
        }
        let value = match parent_import_path(name) {
            None => true,
            Some(parent) => {
                names.contains(parent) && is_reachable(parent, names, reachable)
            }
        };
        reachable.insert(name.to_owned(), value);
        value
    }
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        if is_reachable(record.name(), &names, &mut reachable) {
            kept.push(record);
        } else if mode == UnreachableMode::Error {
            return Err(ScopeError::UnreachableModule {
                name: record.name().to_owned(),
                root: root_component(record.name()).to_owned(),
            });
        } else {
            debug!(module = record.name(), "skipping unreachable module");
        }
    }
    Ok(kept)
}
