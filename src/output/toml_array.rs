//! Comment-preserving writer for TOML dependency arrays.
//!
//! The target file is edited in place: only the addressed array is
//! rewritten, everything else in the document keeps its formatting.
//! Annotations and source attributions are emitted as comments inside
//! the array, using the trivia attached to each element.

use std::path::Path;

use toml_edit::{Array, DocumentMut, Item, Value};

use crate::generate::{WriteMode, WriteRequirement};

use super::{AUTOGEN_BANNER, OutputError, requirement_flags, source_flags};

const INDENT: &str = "    ";
const SOURCE_INDENT: &str = "        ";

/// Replace the array at `keys` (e.g. `["project", "dependencies"]` or
/// `["project", "optional-dependencies", "extras"]`) with the given
/// requirements. Missing intermediate tables and the array itself are
/// created; a non-table or non-array in the way is an error.
pub fn write_toml_array(
    file: &Path,
    keys: &[&str],
    requirements: &[WriteRequirement],
) -> Result<(), OutputError> {
    let text = std::fs::read_to_string(file).map_err(|source| OutputError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let mut doc: DocumentMut = text.parse().map_err(|source| OutputError::Toml {
        path: file.to_path_buf(),
        source,
    })?;

    let array = navigate_to_array(&mut doc, file, keys)?;
    render_into(array, requirements);

    std::fs::write(file, doc.to_string()).map_err(|source| OutputError::Io {
        path: file.to_path_buf(),
        source,
    })
}

fn navigate_to_array<'doc>(
    doc: &'doc mut DocumentMut,
    file: &Path,
    keys: &[&str],
) -> Result<&'doc mut Array, OutputError> {
    let mut table = doc.as_table_mut();
    let (last, intermediate) = match keys.split_last() {
        Some(split) => split,
        None => {
            return Err(OutputError::NotAnArray {
                path: file.to_path_buf(),
                key: String::new(),
            });
        }
    };
    for key in intermediate {
        let item = table.entry(key).or_insert(toml_edit::table());
        table = item.as_table_mut().ok_or_else(|| OutputError::NotATable {
            path: file.to_path_buf(),
            key: (*key).to_owned(),
        })?;
    }
    let item = table
        .entry(last)
        .or_insert(Item::Value(Value::Array(Array::new())));
    item.as_array_mut().ok_or_else(|| OutputError::NotAnArray {
        path: file.to_path_buf(),
        key: (*last).to_owned(),
    })
}

/// Rebuild the array contents, attaching annotations as element trivia.
///
/// A same-line comment belongs to the trivia of whatever follows it, so
/// comment text is buffered in `pending` and flushed as the prefix of the
/// next value, or as the array's trailing trivia at the end.
fn render_into(array: &mut Array, requirements: &[WriteRequirement]) {
    array.clear();
    if requirements.is_empty() {
        array.set_trailing("");
        array.set_trailing_comma(false);
        return;
    }

    let mut pending = format!("\n{INDENT}# {AUTOGEN_BANNER}");
    for requirement in requirements {
        let flags = requirement_flags(requirement);
        match requirement.write_mode {
            WriteMode::Exclude => continue,
            WriteMode::Include => {
                let mut value = Value::from(requirement.requirement.as_str());
                pending.push('\n');
                pending.push_str(INDENT);
                value.decor_mut().set_prefix(pending.clone());
                array.push_formatted(value);
                pending = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" # {flags}")
                };
            }
            WriteMode::Comment => {
                pending.push('\n');
                pending.push_str(INDENT);
                pending.push_str(&format!("# \"{}\"", requirement.requirement));
                if !flags.is_empty() {
                    pending.push_str(&format!(" {flags}"));
                }
            }
        }
        for source in &requirement.sources {
            if source.write_mode == WriteMode::Exclude {
                continue;
            }
            let flags = source_flags(source);
            pending.push('\n');
            pending.push_str(SOURCE_INDENT);
            pending.push_str("# \u{2190}");
            if !flags.is_empty() {
                pending.push_str(&format!(" {flags}"));
            }
            pending.push_str(&format!(" \"{}\"", source.source_module));
        }
    }
    pending.push('\n');
    array.set_trailing(pending);
    array.set_trailing_comma(!array.is_empty());
}
