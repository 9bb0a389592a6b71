//! Import extraction from Python source files.
//!
//! The scanner walks a module's AST and records every `import`,
//! `from ... import` and lazy-import call as an [`ImportOccurrence`].
//! Occurrences inside function bodies or `TYPE_CHECKING` blocks are
//! marked lazy; resolution can then choose to follow or skip them.

mod cache;
mod scanner;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::base::Span;
use crate::scan::ModuleRecord;

pub use cache::{ImportCache, ImportLoadError};
pub use scanner::{ImportScanError, scan_file, scan_source};

/// How an import target was referenced in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// A plain `import a.b` statement.
    Import,
    /// A `from a.b import x` statement.
    ImportFrom,
    /// A call to a lazy-import helper such as `lazy_import("a.b")`.
    LazyCall,
}

/// One textual reference to an import target inside one module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportOccurrence {
    /// Module the reference appears in.
    pub source: Arc<ModuleRecord>,
    /// Fully resolved dotted target, relative imports already expanded.
    pub target: String,
    pub kind: ImportKind,
    /// Whether the reference only executes lazily (function body,
    /// `TYPE_CHECKING` block, or lazy-import call).
    pub is_lazy: bool,
    /// Whether the reference was written as a relative import.
    pub is_relative: bool,
    pub span: Span,
    /// AST node types from the module root down to the reference.
    pub context: Vec<&'static str>,
}

/// All imports of a single module, grouped by target in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImports {
    module: Arc<ModuleRecord>,
    imports: IndexMap<String, Vec<ImportOccurrence>>,
}

impl ModuleImports {
    pub(crate) fn new(module: Arc<ModuleRecord>, occurrences: Vec<ImportOccurrence>) -> Self {
        let mut imports: IndexMap<String, Vec<ImportOccurrence>> = IndexMap::new();
        for occurrence in occurrences {
            imports
                .entry(occurrence.target.clone())
                .or_default()
                .push(occurrence);
        }
        Self { module, imports }
    }

    pub fn module(&self) -> &Arc<ModuleRecord> {
        &self.module
    }

    /// Targets in encounter order, with their occurrences.
    pub fn imports(&self) -> &IndexMap<String, Vec<ImportOccurrence>> {
        &self.imports
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.imports.keys().map(String::as_str)
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &ImportOccurrence> {
        self.imports.values().flatten()
    }
}
