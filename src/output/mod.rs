//! Writers that render requirements into output files.

mod requirements_txt;
mod toml_array;

use std::path::PathBuf;

use thiserror::Error;

use crate::generate::{RequirementSource, WriteRequirement};

pub use requirements_txt::{TxtOptions, render_requirements_txt, write_requirements_txt};
pub use toml_array::write_toml_array;

/// Marker line placed at the top of every generated block.
pub const AUTOGEN_BANNER: &str = "[AUTOGEN] by reqtrace **DO NOT EDIT** [AUTOGEN]";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to access output file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML in {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },
    #[error("cannot write into {path:?}: key {key:?} is not a table")]
    NotATable { path: PathBuf, key: String },
    #[error("cannot write into {path:?}: key {key:?} is not an array")]
    NotAnArray { path: PathBuf, key: String },
}

/// `[LeB]`-style annotation for a requirement or source line.
///
/// `L` marks an entry whose occurrences are all lazy, `e` a source inside
/// the resolution scope but not the start scope, `E` a source outside the
/// scope entirely, and `B` a builtin.
fn mode_flags(all_lazy: bool, in_start: bool, in_scope: bool, is_builtin: bool) -> String {
    let mut flags = String::new();
    if all_lazy {
        flags.push('L');
    }
    if in_start {
        // sources in the start scope need no location marker
    } else if in_scope {
        flags.push('e');
    } else {
        flags.push('E');
    }
    if is_builtin {
        flags.push('B');
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!("[{flags}]")
    }
}

pub(crate) fn requirement_flags(requirement: &WriteRequirement) -> String {
    mode_flags(
        requirement.all_lazy(),
        requirement.any_source_in_start(),
        requirement.any_source_in_scope(),
        requirement.is_builtin,
    )
}

pub(crate) fn source_flags(source: &RequirementSource) -> String {
    mode_flags(
        source.all_lazy,
        source.source_in_start,
        source.source_in_scope,
        source.is_builtin,
    )
}
