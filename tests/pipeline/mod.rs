//! Pipeline tests, ordered from module discovery through to output files.

pub mod tests_config;
pub mod tests_generate;
pub mod tests_scope;
