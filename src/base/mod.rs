//! Foundation types: source positions, dotted import paths, filesystem helpers.

mod paths;
mod position;

pub use paths::{
    InvalidImportPath, is_identifier, parent_import_path, resolve_under_root, root_component,
    validate_import_path, validate_origin_tag,
};
pub use position::{LineIndex, Position, Span};
