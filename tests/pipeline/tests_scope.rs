//! Module discovery and scope manipulation against real file trees.

use rstest::rstest;

use reqtrace::scope::{ModuleScope, RestrictMode, RestrictOp, ScopeError, UnreachableMode};

use crate::helpers::fixture_tree::{full_scope, module_tree};

#[test]
fn test_search_path_discovery() {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let mut names: Vec<&str> = scope.module_names().collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "A",
            "A.a1",
            "A.a2",
            "A.a3",
            "A.a3.a3i",
            "A.a4.a4i",
            "B",
            "B.b1",
            "B.b2",
            "C",
        ]
    );
    assert!(scope.get_record("A").unwrap().is_package());
    assert!(!scope.get_record("C").unwrap().is_package());
}

#[test]
fn test_unreachable_module_is_an_error_by_default() {
    let tree = module_tree();
    let mut scope = ModuleScope::new();
    let err = scope
        .add_from_search_path(tree.path(), Some("fixture"), UnreachableMode::Error)
        .unwrap_err();
    match err {
        ScopeError::UnreachableModule { name, root } => {
            assert_eq!(name, "A.a4.a4i");
            assert_eq!(root, "A");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(scope.is_empty());
}

#[test]
fn test_unreachable_module_skip() {
    let tree = module_tree();
    let mut scope = ModuleScope::new();
    scope
        .add_from_search_path(tree.path(), Some("fixture"), UnreachableMode::Skip)
        .unwrap();
    assert!(!scope.has_module("A.a4.a4i"));
    assert!(scope.has_module("A.a3.a3i"));
}

#[test]
fn test_package_path_discovery() {
    let tree = module_tree();
    let mut scope = ModuleScope::new();
    scope
        .add_from_package_path(
            &tree.path().join("B"),
            Some("pkg_b"),
            UnreachableMode::Error,
        )
        .unwrap();
    let mut names: Vec<&str> = scope.module_names().collect();
    names.sort();
    assert_eq!(names, vec!["B", "B.b1", "B.b2"]);
    assert_eq!(scope.get_record("B.b1").unwrap().origin(), "pkg_b");
}

#[test]
fn test_single_file_package_path() {
    let tree = module_tree();
    let mut scope = ModuleScope::new();
    scope
        .add_from_package_path(&tree.path().join("C.py"), Some("c"), UnreachableMode::Error)
        .unwrap();
    assert_eq!(scope.module_names().collect::<Vec<_>>(), vec!["C"]);
}

#[test]
fn test_adding_same_tree_twice_reports_duplicate_paths() {
    let tree = module_tree();
    let mut scope = full_scope(tree.path());
    let err = scope
        .add_from_search_path(tree.path(), Some("again"), UnreachableMode::Keep)
        .unwrap_err();
    assert!(matches!(err, ScopeError::DuplicateModulePaths { .. }));
}

#[test]
fn test_merging_overlapping_scopes_fails_without_mutation() {
    let tree = module_tree();
    let mut left = full_scope(tree.path());
    let right = full_scope(tree.path());
    let before = left.len();
    assert!(left.merge(&right).is_err());
    assert_eq!(left.len(), before);
}

#[test]
fn test_merging_disjoint_scopes() {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let mut merged = scope
        .restrict(&["A".to_owned()], RestrictMode::Children, RestrictOp::Limit)
        .unwrap();
    let b_scope = scope
        .restrict(&["B".to_owned()], RestrictMode::Children, RestrictOp::Limit)
        .unwrap();
    merged.merge(&b_scope).unwrap();
    assert!(merged.has_module("A.a1"));
    assert!(merged.has_module("B.b2"));
    assert!(!merged.has_module("C"));
}

#[rstest]
#[case(RestrictMode::Exact, RestrictOp::Limit, vec!["A"])]
#[case(RestrictMode::Children, RestrictOp::Limit, vec!["A", "A.a1", "A.a2", "A.a3", "A.a3.a3i", "A.a4.a4i"])]
#[case(RestrictMode::RootChildren, RestrictOp::Limit, vec!["A", "A.a1", "A.a2", "A.a3", "A.a3.a3i", "A.a4.a4i"])]
#[case(RestrictMode::Exact, RestrictOp::Exclude, vec!["A.a1", "A.a2", "A.a3", "A.a3.a3i", "A.a4.a4i", "B", "B.b1", "B.b2", "C"])]
#[case(RestrictMode::Children, RestrictOp::Exclude, vec!["B", "B.b1", "B.b2", "C"])]
fn test_restrict_matrix(
    #[case] mode: RestrictMode,
    #[case] op: RestrictOp,
    #[case] expected: Vec<&str>,
) {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let restricted = scope.restrict(&["A".to_owned()], mode, op).unwrap();
    let mut names: Vec<&str> = restricted.module_names().collect();
    names.sort();
    assert_eq!(names, expected);
}

#[test]
fn test_restrict_is_idempotent() {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let anchors = vec!["A".to_owned()];
    let once = scope
        .restrict(&anchors, RestrictMode::Children, RestrictOp::Limit)
        .unwrap();
    let twice = once
        .restrict(&anchors, RestrictMode::Children, RestrictOp::Limit)
        .unwrap();
    assert!(once.is_equal(&twice));
}

#[test]
fn test_restrict_exclude_is_idempotent() {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let anchors = vec!["A".to_owned()];
    // the first exclusion removes the anchor itself; applying the same
    // exclusion again must be a no-op, not an error
    let once = scope
        .restrict(&anchors, RestrictMode::Children, RestrictOp::Exclude)
        .unwrap();
    let twice = once
        .restrict(&anchors, RestrictMode::Children, RestrictOp::Exclude)
        .unwrap();
    assert!(once.is_equal(&twice));
    assert!(!once.has_module("A"));
    assert!(once.has_module("B.b1"));
}

#[test]
fn test_subset_relations() {
    let tree = module_tree();
    let scope = full_scope(tree.path());
    let sub = scope
        .restrict(&["A".to_owned()], RestrictMode::Children, RestrictOp::Limit)
        .unwrap();
    assert!(sub.is_subset_of(&scope));
    assert!(scope.is_superset_of(&sub));
    assert!(!scope.is_subset_of(&sub));
    assert!(scope.conflicts_with(&sub));
}
