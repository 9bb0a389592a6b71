//! Crate-level error type aggregating each stage's failures.

use thiserror::Error;

use crate::config::ConfigError;
use crate::generate::GenerateError;
use crate::imports::{ImportLoadError, ImportScanError};
use crate::mapping::MappingError;
use crate::output::OutputError;
use crate::resolve::ResolveError;
use crate::scan::DiscoveryError;
use crate::scope::ScopeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Scan(#[from] ImportScanError),
    #[error(transparent)]
    Load(#[from] ImportLoadError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Output(#[from] OutputError),
}
