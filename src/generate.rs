//! Turning resolved imports into an ordered list of writable requirements.
//!
//! Each resolved target is mapped to a requirement, grouped by the source
//! modules that import it, and given a [`WriteMode`]. Write rules only
//! ever escalate a mode (include < comment < exclude), so a requirement
//! matching several rules takes the strictest one.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::builtin::is_builtin_module;
use crate::imports::{ImportCache, ImportOccurrence};
use crate::mapping::{MappingError, RequirementsMapper};
use crate::resolve::{ResolveError, ScopeResolvedImports};
use crate::scope::ModuleScope;

/// How a requirement (or one of its sources) appears in the output.
///
/// Variants are ordered by strictness so rule application can take the
/// maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Include,
    Comment,
    Exclude,
}

/// Escalation rules applied to every requirement and source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRules {
    /// Applied when the entry is a builtin module.
    pub builtin: WriteMode,
    /// Applied when any imported target lies inside the start scope.
    pub start_scope: WriteMode,
    /// Applied when every occurrence is lazy.
    pub lazy: WriteMode,
}

impl Default for WriteRules {
    fn default() -> Self {
        Self {
            builtin: WriteMode::Exclude,
            start_scope: WriteMode::Exclude,
            lazy: WriteMode::Comment,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("eager imports must be a subset of all imports, extra: {extra:?}")]
    ExplicitNotSubset { extra: Vec<String> },
}

/// One source module contributing imports to a requirement.
#[derive(Debug, Clone)]
pub struct RequirementSource {
    pub source_module: String,
    pub occurrences: Vec<ImportOccurrence>,
    /// Sorted unique targets this source imported under the requirement.
    pub target_imports: Vec<String>,
    pub all_lazy: bool,
    pub any_target_in_scope: bool,
    pub any_target_in_start: bool,
    pub source_in_scope: bool,
    pub source_in_start: bool,
    pub is_builtin: bool,
    pub write_mode: WriteMode,
}

impl RequirementSource {
    fn apply_write_rules(&mut self, rules: &WriteRules) {
        let mut mode = self.write_mode;
        if self.is_builtin {
            mode = mode.max(rules.builtin);
        }
        if self.any_target_in_start {
            mode = mode.max(rules.start_scope);
        }
        if self.all_lazy {
            mode = mode.max(rules.lazy);
        }
        self.write_mode = mode;
    }
}

/// A requirement with everything the writers need to render it.
#[derive(Debug, Clone)]
pub struct WriteRequirement {
    pub requirement: SmolStr,
    pub sources: Vec<RequirementSource>,
    pub is_builtin: bool,
    pub write_mode: WriteMode,
}

impl WriteRequirement {
    pub fn all_lazy(&self) -> bool {
        self.sources.iter().all(|src| src.all_lazy)
    }

    pub fn any_target_in_scope(&self) -> bool {
        self.sources.iter().any(|src| src.any_target_in_scope)
    }

    pub fn any_target_in_start(&self) -> bool {
        self.sources.iter().any(|src| src.any_target_in_start)
    }

    pub fn any_source_in_scope(&self) -> bool {
        self.sources.iter().any(|src| src.source_in_scope)
    }

    pub fn any_source_in_start(&self) -> bool {
        self.sources.iter().any(|src| src.source_in_start)
    }

    fn apply_write_rules(&mut self, rules: &WriteRules) {
        let mut mode = self.write_mode;
        if self.is_builtin {
            mode = mode.max(rules.builtin);
        }
        if self.any_target_in_start() {
            mode = mode.max(rules.start_scope);
        }
        if self.all_lazy() {
            mode = mode.max(rules.lazy);
        }
        self.write_mode = mode;
    }
}

/// Resolve, map and group the requirements for one output.
///
/// Builtin targets become requirements named after themselves rather than
/// going through the mapper. Unmapped imports are collected across the
/// whole run and reported in a single error.
pub fn generate_requirements(
    scope: &ModuleScope,
    start: Option<&ModuleScope>,
    mapper: &mut RequirementsMapper,
    env: &str,
    rules: &WriteRules,
    skip_lazy: bool,
    cache: &mut ImportCache,
) -> Result<Vec<WriteRequirement>, GenerateError> {
    let start = start.unwrap_or(scope);

    let resolved_explicit = ScopeResolvedImports::resolve(scope, Some(start), true, cache)?;
    let resolved_all = ScopeResolvedImports::resolve(scope, Some(start), false, cache)?;

    // eager-only resolution must never see more than the full resolution
    let extra: Vec<String> = resolved_explicit
        .imports()
        .keys()
        .filter(|target| !resolved_all.imports().contains_key(*target))
        .cloned()
        .collect();
    if !extra.is_empty() {
        return Err(GenerateError::ExplicitNotSubset { extra });
    }

    let basis = if skip_lazy {
        &resolved_explicit
    } else {
        &resolved_all
    };

    let by_source = basis.imports_by_source();

    // requirement -> source module -> occurrences
    let mut grouped: BTreeMap<SmolStr, BTreeMap<String, Vec<ImportOccurrence>>> = BTreeMap::new();
    let mut unresolved_imports: BTreeSet<String> = BTreeSet::new();
    let mut unresolved_roots: BTreeSet<String> = BTreeSet::new();

    let mut targets: Vec<&String> = basis.imports().keys().collect();
    targets.sort();
    for target in targets {
        let requirement = if is_builtin_module(target) {
            SmolStr::new(target)
        } else {
            match mapper.map_import(target, env) {
                Ok(requirement) => requirement,
                Err(MappingError::Unresolved { imports, roots }) => {
                    unresolved_imports.extend(imports);
                    unresolved_roots.extend(roots);
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        };
        let sources = grouped.entry(requirement).or_default();
        if let Some(source_occurrences) = by_source.get(target.as_str()) {
            for (source_module, occurrences) in source_occurrences {
                sources
                    .entry((*source_module).to_owned())
                    .or_default()
                    .extend(occurrences.iter().map(|occ| (*occ).clone()));
            }
        }
    }
    if !unresolved_imports.is_empty() {
        return Err(MappingError::Unresolved {
            imports: unresolved_imports,
            roots: unresolved_roots,
        }
        .into());
    }

    let mut requirements = Vec::with_capacity(grouped.len());
    for (requirement, sources) in grouped {
        let mut source_entries = Vec::with_capacity(sources.len());
        for (source_module, occurrences) in sources {
            let target_imports: Vec<String> = occurrences
                .iter()
                .map(|occ| occ.target.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let mut entry = RequirementSource {
                all_lazy: occurrences.iter().all(|occ| occ.is_lazy),
                any_target_in_scope: target_imports
                    .iter()
                    .any(|target| scope.has_module(target)),
                any_target_in_start: target_imports
                    .iter()
                    .any(|target| start.has_module(target)),
                source_in_scope: scope.has_module(&source_module),
                source_in_start: start.has_module(&source_module),
                is_builtin: is_builtin_module(&source_module),
                source_module,
                occurrences,
                target_imports,
                write_mode: WriteMode::Include,
            };
            entry.apply_write_rules(rules);
            source_entries.push(entry);
        }
        let mut write_req = WriteRequirement {
            is_builtin: is_builtin_module(&requirement),
            requirement,
            sources: source_entries,
            write_mode: WriteMode::Include,
        };
        write_req.apply_write_rules(rules);
        requirements.push(write_req);
    }
    Ok(requirements)
}
