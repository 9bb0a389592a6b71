//! Mapping of import targets to declared requirement names.
//!
//! A [`RequirementsMapper`] holds ordered matcher lists per requirements
//! environment. Matchers are tried first to last within the requested
//! environment, then within the default environment, and the first match
//! wins, so declaration order is significant when patterns overlap.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::warn;

use crate::base::{is_identifier, root_component};
use crate::scope::ModuleScope;

/// Environment matchers fall back to when no specific one is requested.
pub const DEFAULT_ENV: &str = "default";

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("invalid import glob {pattern:?}: {reason}")]
    InvalidGlob { pattern: String, reason: String },
    #[error("requirements environment is not declared: {env:?}")]
    UndeclaredEnv { env: String },
    #[error(
        "no requirement mapping configured for import roots {roots:?} \
         (full imports: {imports:?})"
    )]
    Unresolved {
        imports: BTreeSet<String>,
        roots: BTreeSet<String>,
    },
}

/// A dotted glob pattern over import paths.
///
/// Every component must be an identifier; the final component may instead
/// be `*`, which matches the fixed prefix itself and anything nested below
/// it, so `a.b.*` matches `a.b` and `a.b.c` but not `a.bc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportGlob {
    prefix: String,
    wildcard: bool,
}

impl ImportGlob {
    pub fn new(pattern: &str) -> Result<Self, MappingError> {
        let invalid = |reason: &str| MappingError::InvalidGlob {
            pattern: pattern.to_owned(),
            reason: reason.to_owned(),
        };
        if pattern.is_empty() {
            return Err(invalid("pattern must not be empty"));
        }
        let parts: Vec<&str> = pattern.split('.').collect();
        let Some((last, fixed)) = parts.split_last() else {
            return Err(invalid("pattern must not be empty"));
        };
        let wildcard = *last == "*";
        if wildcard && fixed.is_empty() {
            return Err(invalid("a lone wildcard is not allowed"));
        }
        if !wildcard && !is_identifier(last) {
            return Err(invalid("last component must be an identifier or `*`"));
        }
        for part in fixed {
            if !is_identifier(part) {
                return Err(invalid("components before the last must be identifiers"));
            }
        }
        let prefix = if wildcard {
            fixed.join(".")
        } else {
            parts.join(".")
        };
        Ok(Self { prefix, wildcard })
    }

    pub fn matches(&self, path: &str) -> bool {
        if path == self.prefix {
            return true;
        }
        self.wildcard
            && path.len() > self.prefix.len()
            && path.starts_with(&self.prefix)
            && path.as_bytes()[self.prefix.len()] == b'.'
    }
}

/// How one requirement claims import targets.
#[derive(Debug, Clone)]
pub enum ImportMatcher {
    /// Matches any module of the given scope.
    Scope(ModuleScope),
    /// Matches a dotted glob pattern.
    Glob(ImportGlob),
}

impl ImportMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            ImportMatcher::Scope(scope) => scope.has_module(path),
            ImportMatcher::Glob(glob) => glob.matches(path),
        }
    }
}

/// Ordered requirement matchers, grouped by environment.
#[derive(Debug, Default)]
pub struct RequirementsMapper {
    env_matchers: IndexMap<SmolStr, Vec<(SmolStr, ImportMatcher)>>,
    strict: bool,
    resolved: FxHashMap<(String, SmolStr), SmolStr>,
}

impl RequirementsMapper {
    /// In strict mode unmatched imports are errors; otherwise they fall
    /// back to their root component with a warning.
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Append a matcher to the end of an environment's list.
    pub fn add_matcher(&mut self, env: &str, requirement: &str, matcher: ImportMatcher) {
        self.env_matchers
            .entry(SmolStr::new(env))
            .or_default()
            .push((SmolStr::new(requirement), matcher));
    }

    pub fn has_env(&self, env: &str) -> bool {
        self.env_matchers.contains_key(env)
    }

    /// Map one import target to its requirement.
    ///
    /// Matching order is the requested environment's list, then the
    /// default environment's list. Results are memoized per (import, env).
    pub fn map_import(&mut self, path: &str, env: &str) -> Result<SmolStr, MappingError> {
        if env != DEFAULT_ENV && !self.env_matchers.contains_key(env) {
            return Err(MappingError::UndeclaredEnv {
                env: env.to_owned(),
            });
        }
        let key = (path.to_owned(), SmolStr::new(env));
        if let Some(requirement) = self.resolved.get(&key) {
            return Ok(requirement.clone());
        }
        let mut search_envs = vec![env];
        if env != DEFAULT_ENV {
            search_envs.push(DEFAULT_ENV);
        }
        for search_env in search_envs {
            let Some(matchers) = self.env_matchers.get(search_env) else {
                continue;
            };
            for (requirement, matcher) in matchers {
                if matcher.matches(path) {
                    self.resolved.insert(key, requirement.clone());
                    return Ok(requirement.clone());
                }
            }
        }
        if self.strict {
            return Err(MappingError::Unresolved {
                imports: BTreeSet::from([path.to_owned()]),
                roots: BTreeSet::from([root_component(path).to_owned()]),
            });
        }
        let root = SmolStr::new(root_component(path));
        warn!(
            import = path,
            requirement = %root,
            "no requirement mapping configured, falling back to the import root"
        );
        self.resolved.insert(key, root.clone());
        Ok(root)
    }
}
