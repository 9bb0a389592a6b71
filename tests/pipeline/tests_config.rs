//! Manifest-driven end-to-end runs.

use std::fs;

use reqtrace::config::{ConfigError, ReqtraceCfg};
use reqtrace::Error;

use crate::helpers::fixture_tree::config_repo;

const BASE_MANIFEST: &str = r#"
[tool.reqtrace]
default_root = "."
versions = [
    { requirement = "extern-c-pkg>=1.0", import = "extern_C.*" },
    { requirement = "extern-lazy-pkg", import = "extern_lazy.*" },
]

[[tool.reqtrace.scopes]]
name = "all"
search_paths = "src"
"#;

#[test]
fn test_run_writes_project_dependencies() {
    let (repo, manifest) = config_repo(&format!(
        "{BASE_MANIFEST}
[[tool.reqtrace.resolvers]]
scope = \"all\"
output_mode = \"dependencies\"
"
    ));
    reqtrace::run(&manifest).unwrap();
    let written = fs::read_to_string(repo.path().join("pyproject.toml")).unwrap();
    assert!(written.contains("[AUTOGEN] by reqtrace"));
    assert!(written.contains("\"extern-c-pkg>=1.0\""));
    // the lazy-only import is commented out by the default rules
    assert!(written.contains("# \"extern-lazy-pkg\""));
    // the builtin os import is excluded by the default rules
    assert!(!written.contains("\"os\""));
    // source attribution comments
    assert!(written.contains("\"C\""));
}

#[test]
fn test_run_writes_optional_dependencies_under_output_name() {
    let (repo, manifest) = config_repo(&format!(
        "{BASE_MANIFEST}
[[tool.reqtrace.resolvers]]
scope = \"all\"
output_mode = \"optional-dependencies\"
output_name = \"extras\"
"
    ));
    reqtrace::run(&manifest).unwrap();
    let written = fs::read_to_string(repo.path().join("pyproject.toml")).unwrap();
    assert!(written.contains("[project.optional-dependencies]"));
    assert!(written.contains("extras = ["));
    assert!(written.contains("\"extern-c-pkg>=1.0\""));
}

#[test]
fn test_run_writes_requirements_file() {
    let (repo, manifest) = config_repo(&format!(
        "{BASE_MANIFEST}
[[tool.reqtrace.resolvers]]
scope = \"all\"
output_mode = \"requirements\"
output_file = \"requirements.txt\"
"
    ));
    reqtrace::run(&manifest).unwrap();
    let written = fs::read_to_string(repo.path().join("requirements.txt")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert!(lines[0].contains("[AUTOGEN] by reqtrace"));
    assert!(lines.iter().any(|line| line.starts_with("extern-c-pkg>=1.0")));
    assert!(lines.iter().any(|line| line.starts_with("# extern-lazy-pkg")));
}

#[test]
fn test_run_with_undeclared_mapping_fails() {
    let (_repo, manifest) = config_repo(
        r#"
[tool.reqtrace]
default_root = "."

[[tool.reqtrace.scopes]]
name = "all"
search_paths = "src"

[[tool.reqtrace.resolvers]]
scope = "all"
output_mode = "dependencies"
"#,
    );
    let err = reqtrace::run(&manifest).unwrap_err();
    assert!(matches!(err, Error::Generate(_)));
}

#[test]
fn test_missing_section_is_reported() {
    let (_repo, manifest) = config_repo("");
    let err = ReqtraceCfg::from_manifest(&manifest).unwrap_err();
    assert!(matches!(err, ConfigError::MissingSection { .. }));
}

#[test]
fn test_scope_limit_and_exclude_from_manifest() {
    let (_repo, manifest) = config_repo(
        r#"
[tool.reqtrace]
default_root = "."

[[tool.reqtrace.scopes]]
name = "all"
search_paths = "src"

[[tool.reqtrace.scopes]]
name = "trimmed"
parents = ["all"]
exclude = "lazy_user"
"#,
    );
    let cfg = ReqtraceCfg::from_manifest(&manifest).unwrap();
    let scopes = cfg.load_scopes().unwrap();
    assert!(scopes["all"].has_module("lazy_user"));
    assert!(!scopes["trimmed"].has_module("lazy_user"));
    assert!(scopes["trimmed"].has_module("C"));
}

#[test]
fn test_subscope_definition_order() {
    let (_repo, manifest) = config_repo(
        r#"
[tool.reqtrace]
default_root = "."

[[tool.reqtrace.scopes]]
name = "all"
search_paths = "src"
subscopes = { c_only = "C" }
"#,
    );
    let cfg = ReqtraceCfg::from_manifest(&manifest).unwrap();
    let scopes = cfg.load_scopes().unwrap();
    assert_eq!(
        scopes["c_only"].module_names().collect::<Vec<_>>(),
        vec!["C"]
    );
}
