//! Transitive import resolution across a module scope.
//!
//! Starting from a set of scope modules, the resolver walks the import
//! graph edge by edge: every import edge reachable from the start set is
//! visited exactly once, and traversal only continues through targets
//! that are themselves in the scope. External targets terminate a path
//! but are still collected.

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::warn;

use crate::builtin::is_builtin_module;
use crate::imports::{ImportCache, ImportLoadError, ImportOccurrence};
use crate::scope::ModuleScope;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("start scope is not a subset of the resolution scope, missing: {missing:?}")]
    StartNotASubset { missing: Vec<String> },
    #[error(transparent)]
    Cache(ImportLoadError),
}

/// The resolved imports of one scope, keyed by target.
#[derive(Debug)]
pub struct ScopeResolvedImports {
    imports: IndexMap<String, IndexSet<ImportOccurrence>>,
    scope_modules: IndexSet<String>,
}

impl ScopeResolvedImports {
    /// Resolve all imports reachable from `start` (or the whole scope).
    ///
    /// With `skip_lazy`, lazy occurrences are dropped while the graph is
    /// built, and an edge left with no eager occurrence is omitted
    /// entirely, so modules only reachable through lazy imports are not
    /// visited either. Files that fail to read or parse are skipped with
    /// a warning; a cache record mismatch is fatal.
    pub fn resolve(
        scope: &ModuleScope,
        start: Option<&ModuleScope>,
        skip_lazy: bool,
        cache: &mut ImportCache,
    ) -> Result<Self, ResolveError> {
        if let Some(start) = start {
            let missing: Vec<String> = start
                .module_names()
                .filter(|name| !scope.has_module(name))
                .map(str::to_owned)
                .collect();
            if !missing.is_empty() {
                return Err(ResolveError::StartNotASubset { missing });
            }
        }

        // target -> occurrences, per source module
        let mut edges: IndexMap<&str, IndexMap<String, Vec<ImportOccurrence>>> = IndexMap::new();
        for record in scope.iter_records() {
            let imports = match cache.load(record) {
                Ok(imports) => imports,
                Err(ImportLoadError::Scan(err)) => {
                    warn!(module = record.name(), error = %err, "skipping unscannable module");
                    continue;
                }
                Err(err @ ImportLoadError::RecordMismatch { .. }) => {
                    return Err(ResolveError::Cache(err));
                }
            };
            let mut out: IndexMap<String, Vec<ImportOccurrence>> = IndexMap::new();
            for (target, occurrences) in imports.imports() {
                let kept: Vec<ImportOccurrence> = if skip_lazy {
                    occurrences
                        .iter()
                        .filter(|occ| !occ.is_lazy)
                        .cloned()
                        .collect()
                } else {
                    occurrences.clone()
                };
                if kept.is_empty() {
                    continue;
                }
                out.insert(target.clone(), kept);
            }
            edges.insert(record.name(), out);
        }

        let start_names: Vec<&str> = match start {
            Some(start) => start.module_names().collect(),
            None => scope.module_names().collect(),
        };

        let mut imports: IndexMap<String, IndexSet<ImportOccurrence>> = IndexMap::new();
        let mut visited: IndexSet<&str> = IndexSet::new();
        let mut stack: Vec<&str> = Vec::new();
        for name in start_names {
            if !visited.insert(name) {
                continue;
            }
            stack.push(name);
            while let Some(source) = stack.pop() {
                let Some(targets) = edges.get(source) else {
                    continue;
                };
                for (target, occurrences) in targets {
                    imports
                        .entry(target.clone())
                        .or_default()
                        .extend(occurrences.iter().cloned());
                    if scope.has_module(target) && visited.insert(target.as_str()) {
                        stack.push(target.as_str());
                    }
                }
            }
        }

        Ok(Self {
            imports,
            scope_modules: scope.module_names().map(str::to_owned).collect(),
        })
    }

    /// Resolved targets with their occurrences, in discovery order.
    pub fn imports(&self) -> &IndexMap<String, IndexSet<ImportOccurrence>> {
        &self.imports
    }

    /// Targets regrouped by the module that imported them.
    pub fn imports_by_source(&self) -> IndexMap<&str, IndexMap<&str, Vec<&ImportOccurrence>>> {
        let mut by_source: IndexMap<&str, IndexMap<&str, Vec<&ImportOccurrence>>> =
            IndexMap::new();
        for (target, occurrences) in &self.imports {
            for occurrence in occurrences {
                by_source
                    .entry(target.as_str())
                    .or_default()
                    .entry(occurrence.source.name())
                    .or_default()
                    .push(occurrence);
            }
        }
        by_source
    }

    /// Targets that survive the given filters, with their occurrences.
    pub fn filtered(
        &self,
        exclude_in_scope: bool,
        exclude_builtins: bool,
    ) -> IndexMap<&str, &IndexSet<ImportOccurrence>> {
        self.imports
            .iter()
            .filter(|(target, _)| !(exclude_in_scope && self.scope_modules.contains(*target)))
            .filter(|(target, _)| !(exclude_builtins && is_builtin_module(target)))
            .map(|(target, occurrences)| (target.as_str(), occurrences))
            .collect()
    }

    /// Whether `target` names a module of the resolved scope.
    pub fn is_in_scope(&self, target: &str) -> bool {
        self.scope_modules.contains(target)
    }

    /// Occurrence counts per target and source, for inspection and tests.
    pub fn source_counts(&self) -> BTreeMap<String, BTreeMap<String, usize>> {
        let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for (target, occurrences) in &self.imports {
            let entry = counts.entry(target.clone()).or_default();
            for occurrence in occurrences {
                *entry.entry(occurrence.source.name().to_owned()).or_default() += 1;
            }
        }
        counts
    }
}
