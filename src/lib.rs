//! # reqtrace
//!
//! Trace Python import graphs and generate annotated requirement manifests.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! config    → [tool.reqtrace] manifest model, scope/output orchestration
//!   ↓
//! output    → requirements.txt and TOML-array writers
//!   ↓
//! generate  → requirement grouping, write modes and write rules
//!   ↓
//! mapping   → import-to-requirement matchers, environments
//!   ↓
//! resolve   → transitive import resolution over a scope
//!   ↓
//! imports   → AST import extraction, per-run scan cache
//!   ↓
//! scope     → module scopes: merge, restrict, containment
//!   ↓
//! scan      → filesystem discovery of Python modules
//!   ↓
//! base      → primitives (positions, dotted paths), builtin → stdlib names
//! ```

// ============================================================================
// MODULES (dependency order: base → scan → scope → imports → resolve →
// mapping → generate → output → config)
// ============================================================================

/// Foundation types: source positions, dotted import paths
pub mod base;

/// Python builtin/stdlib module names
pub mod builtin;

/// Filesystem discovery of Python modules
pub mod scan;

/// Module scopes: merge, restrict, relations
pub mod scope;

/// Import extraction from Python ASTs, with a per-run cache
pub mod imports;

/// Transitive import resolution across a scope
pub mod resolve;

/// Import-to-requirement mapping with ordered matchers
pub mod mapping;

/// Requirement grouping and write-rule application
pub mod generate;

/// Output writers: requirements.txt, TOML dependency arrays
pub mod output;

/// Manifest configuration and end-to-end orchestration
pub mod config;

mod error;

// Re-export the types most callers need
pub use config::{ReqtraceCfg, run};
pub use error::Error;
pub use generate::{WriteMode, WriteRules, generate_requirements};
pub use imports::ImportCache;
pub use mapping::{DEFAULT_ENV, RequirementsMapper};
pub use resolve::ScopeResolvedImports;
pub use scope::{ModuleScope, RestrictMode, RestrictOp, UnreachableMode};
