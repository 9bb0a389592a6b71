//! Per-run cache of scanned module imports.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::scan::ModuleRecord;

use super::{ImportScanError, ModuleImports, scan_file};

#[derive(Debug, Error)]
pub enum ImportLoadError {
    #[error(transparent)]
    Scan(#[from] ImportScanError),
    /// A cached entry for this module name was produced by a different
    /// record. Two scopes disagree about what the module is, so results
    /// would silently mix files; this is always fatal.
    #[error(
        "cached imports for module {name:?} were scanned from {cached:?}, \
         but {requested:?} was requested"
    )]
    RecordMismatch {
        name: String,
        cached: PathBuf,
        requested: PathBuf,
    },
}

/// Memoizes [`scan_file`] results for the duration of one run.
///
/// The cache is an ordinary value handed to resolution, not a process-wide
/// singleton, so concurrent runs over different trees never observe each
/// other's entries.
#[derive(Debug, Default)]
pub struct ImportCache {
    entries: FxHashMap<String, Arc<ModuleImports>>,
}

impl ImportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch the imports of `record`, scanning its file on first use.
    pub fn load(
        &mut self,
        record: &Arc<ModuleRecord>,
    ) -> Result<Arc<ModuleImports>, ImportLoadError> {
        if let Some(cached) = self.entries.get(record.name()) {
            if cached.module() != record {
                return Err(ImportLoadError::RecordMismatch {
                    name: record.name().to_owned(),
                    cached: cached.module().path().to_path_buf(),
                    requested: record.path().to_path_buf(),
                });
            }
            return Ok(cached.clone());
        }
        let imports = Arc::new(scan_file(record)?);
        self.entries
            .insert(record.name().to_owned(), imports.clone());
        Ok(imports)
    }
}
