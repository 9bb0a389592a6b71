//! End-to-end requirement generation over the fixture trees.

use reqtrace::generate::{GenerateError, WriteMode, WriteRules, generate_requirements};
use reqtrace::imports::ImportCache;
use reqtrace::mapping::{DEFAULT_ENV, ImportGlob, ImportMatcher, MappingError, RequirementsMapper};
use reqtrace::scope::{RestrictMode, RestrictOp};

use crate::helpers::fixture_tree::{builtin_tree, full_scope, lazy_tree, module_tree};

fn glob(pattern: &str) -> ImportMatcher {
    ImportMatcher::Glob(ImportGlob::new(pattern).unwrap())
}

fn fixture_mapper() -> RequirementsMapper {
    let mut mapper = RequirementsMapper::new(true);
    for name in [
        "extern_a1",
        "extern_a2",
        "extern_a3i",
        "extern_a4i",
        "extern_b1",
        "extern_b2",
        "extern_C",
    ] {
        mapper.add_matcher(DEFAULT_ENV, name, glob(&format!("{name}.*")));
    }
    mapper.add_matcher(DEFAULT_ENV, "pkg-a", glob("A.*"));
    mapper.add_matcher(DEFAULT_ENV, "pkg-b", glob("B.*"));
    mapper.add_matcher(DEFAULT_ENV, "pkg-c", glob("C.*"));
    mapper
}

#[test]
fn test_generate_for_start_scope() {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let start = scope
        .restrict(&["A".to_owned()], RestrictMode::Children, RestrictOp::Limit)
        .unwrap();
    let mut mapper = fixture_mapper();
    let mut cache = ImportCache::new();
    let requirements = generate_requirements(
        &scope,
        Some(&start),
        &mut mapper,
        DEFAULT_ENV,
        &WriteRules::default(),
        false,
        &mut cache,
    )
    .unwrap();

    let names: Vec<&str> = requirements
        .iter()
        .map(|req| req.requirement.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "extern_C",
            "extern_a1",
            "extern_a2",
            "extern_a3i",
            "extern_a4i",
            "extern_b1",
            "extern_b2",
            "pkg-a",
            "pkg-b",
            "pkg-c",
        ]
    );

    // self-imports within the start scope are excluded by default
    let pkg_a = requirements
        .iter()
        .find(|req| req.requirement == "pkg-a")
        .unwrap();
    assert!(pkg_a.any_target_in_start());
    assert_eq!(pkg_a.write_mode, WriteMode::Exclude);

    // imports of the sibling package stay included
    let pkg_b = requirements
        .iter()
        .find(|req| req.requirement == "pkg-b")
        .unwrap();
    assert!(!pkg_b.any_target_in_start());
    assert_eq!(pkg_b.write_mode, WriteMode::Include);

    // external requirement imported only via a module outside the start
    let extern_b1 = requirements
        .iter()
        .find(|req| req.requirement == "extern_b1")
        .unwrap();
    assert!(extern_b1.any_source_in_scope());
    assert!(!extern_b1.any_source_in_start());
    assert_eq!(extern_b1.sources[0].source_module, "B.b1");
}

#[test]
fn test_generate_batches_unresolved_imports() {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let mut mapper = RequirementsMapper::new(true);
    mapper.add_matcher(DEFAULT_ENV, "pkg-a", glob("A.*"));
    mapper.add_matcher(DEFAULT_ENV, "pkg-b", glob("B.*"));
    mapper.add_matcher(DEFAULT_ENV, "pkg-c", glob("C.*"));
    let mut cache = ImportCache::new();
    let err = generate_requirements(
        &scope,
        None,
        &mut mapper,
        DEFAULT_ENV,
        &WriteRules::default(),
        false,
        &mut cache,
    )
    .unwrap_err();
    match err {
        GenerateError::Mapping(MappingError::Unresolved { imports, roots }) => {
            assert_eq!(imports.len(), 7);
            assert!(roots.contains("extern_a2"));
            assert!(roots.contains("extern_C"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_builtin_requirements_map_to_themselves() {
    let tree = builtin_tree();
    let scope = full_scope(tree.path());
    let mut mapper = RequirementsMapper::new(true);
    mapper.add_matcher(DEFAULT_ENV, "extern_x", glob("extern_x.*"));
    let mut cache = ImportCache::new();

    let rules = WriteRules {
        builtin: WriteMode::Include,
        ..WriteRules::default()
    };
    let requirements = generate_requirements(
        &scope,
        None,
        &mut mapper,
        DEFAULT_ENV,
        &rules,
        false,
        &mut cache,
    )
    .unwrap();
    let os_req = requirements
        .iter()
        .find(|req| req.requirement == "os")
        .unwrap();
    assert!(os_req.is_builtin);
    assert_eq!(os_req.write_mode, WriteMode::Include);

    // with the default rules the builtin is excluded instead
    let mut cache = ImportCache::new();
    let requirements = generate_requirements(
        &scope,
        None,
        &mut mapper,
        DEFAULT_ENV,
        &WriteRules::default(),
        false,
        &mut cache,
    )
    .unwrap();
    let os_req = requirements
        .iter()
        .find(|req| req.requirement == "os")
        .unwrap();
    assert_eq!(os_req.write_mode, WriteMode::Exclude);
}

#[test]
fn test_lazy_requirements_are_commented() {
    let tree = lazy_tree();
    let scope = full_scope(tree.path());
    let mut mapper = RequirementsMapper::new(true);
    mapper.add_matcher(DEFAULT_ENV, "extern_core", glob("extern_core.*"));
    mapper.add_matcher(DEFAULT_ENV, "extern_heavy", glob("extern_heavy.*"));
    mapper.add_matcher(DEFAULT_ENV, "app-pkg", glob("app.*"));
    mapper.add_matcher(DEFAULT_ENV, "core-pkg", glob("core.*"));
    mapper.add_matcher(DEFAULT_ENV, "heavy-pkg", glob("heavy.*"));

    let start = scope
        .restrict(&["app".to_owned()], RestrictMode::Exact, RestrictOp::Limit)
        .unwrap();
    let mut cache = ImportCache::new();
    let requirements = generate_requirements(
        &scope,
        Some(&start),
        &mut mapper,
        DEFAULT_ENV,
        &WriteRules::default(),
        false,
        &mut cache,
    )
    .unwrap();

    // heavy is only ever imported lazily, so it is commented out
    let heavy = requirements
        .iter()
        .find(|req| req.requirement == "heavy-pkg")
        .unwrap();
    assert!(heavy.all_lazy());
    assert_eq!(heavy.write_mode, WriteMode::Comment);

    // but its own eager import of extern_heavy was still followed
    let extern_heavy = requirements
        .iter()
        .find(|req| req.requirement == "extern_heavy")
        .unwrap();
    assert_eq!(extern_heavy.write_mode, WriteMode::Include);
}

#[test]
fn test_skip_lazy_output_drops_lazy_subtree() {
    let tree = lazy_tree();
    let scope = full_scope(tree.path());
    let mut mapper = RequirementsMapper::new(true);
    mapper.add_matcher(DEFAULT_ENV, "extern_core", glob("extern_core.*"));
    mapper.add_matcher(DEFAULT_ENV, "core-pkg", glob("core.*"));

    let start = scope
        .restrict(&["app".to_owned()], RestrictMode::Exact, RestrictOp::Limit)
        .unwrap();
    let mut cache = ImportCache::new();
    let requirements = generate_requirements(
        &scope,
        Some(&start),
        &mut mapper,
        DEFAULT_ENV,
        &WriteRules::default(),
        true,
        &mut cache,
    )
    .unwrap();
    let names: Vec<&str> = requirements
        .iter()
        .map(|req| req.requirement.as_str())
        .collect();
    assert_eq!(names, vec!["core-pkg", "extern_core"]);
}

#[test]
fn test_undeclared_env_aborts_generation() {
    let tree = builtin_tree();
    let scope = full_scope(tree.path());
    let mut mapper = RequirementsMapper::new(true);
    mapper.add_matcher(DEFAULT_ENV, "extern_x", glob("extern_x.*"));
    let mut cache = ImportCache::new();
    let err = generate_requirements(
        &scope,
        None,
        &mut mapper,
        "gpu",
        &WriteRules::default(),
        false,
        &mut cache,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Mapping(MappingError::UndeclaredEnv { .. })
    ));
}
