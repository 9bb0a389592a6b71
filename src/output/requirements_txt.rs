//! Plain `requirements.txt` writer.

use std::path::Path;

use crate::generate::{WriteMode, WriteRequirement};

use super::{AUTOGEN_BANNER, OutputError, requirement_flags, source_flags};

/// Rendering options for requirements files.
#[derive(Debug, Clone, Copy)]
pub struct TxtOptions {
    /// Emit the autogen banner as the first line.
    pub banner: bool,
    /// Emit source-module attribution comments under each requirement.
    pub sources: bool,
}

impl Default for TxtOptions {
    fn default() -> Self {
        Self {
            banner: true,
            sources: true,
        }
    }
}

/// Render requirements as `requirements.txt` text.
pub fn render_requirements_txt(requirements: &[WriteRequirement], options: TxtOptions) -> String {
    let mut out = String::new();
    if options.banner {
        out.push_str(&format!("# {AUTOGEN_BANNER}\n"));
    }
    for requirement in requirements {
        let prefix = match requirement.write_mode {
            WriteMode::Include => "",
            WriteMode::Comment => "# ",
            WriteMode::Exclude => continue,
        };
        let flags = requirement_flags(requirement);
        out.push_str(prefix);
        out.push_str(&requirement.requirement);
        if !flags.is_empty() {
            out.push_str(&format!(" # {flags}"));
        }
        out.push('\n');
        if options.sources {
            for source in &requirement.sources {
                if source.write_mode == WriteMode::Exclude {
                    continue;
                }
                let flags = source_flags(source);
                out.push_str("#     \u{2190}");
                if !flags.is_empty() {
                    out.push_str(&format!(" {flags}"));
                }
                out.push_str(&format!(" {}\n", source.source_module));
            }
        }
    }
    out
}

/// Write requirements to `file`, replacing its contents.
pub fn write_requirements_txt(
    file: &Path,
    requirements: &[WriteRequirement],
    options: TxtOptions,
) -> Result<(), OutputError> {
    let text = render_requirements_txt(requirements, options);
    std::fs::write(file, text).map_err(|source| OutputError::Io {
        path: file.to_path_buf(),
        source,
    })
}
