//! On-disk Python module trees used across the integration suite.
//!
//! The main tree has two packages `A` and `B`, a top-level module `C`,
//! and a deliberately broken sub-package `A/a4` without an `__init__.py`
//! so its module `A.a4.a4i` is unreachable.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use reqtrace::scope::{ModuleScope, UnreachableMode};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// The main module tree. Import edges, with occurrence counts:
///
/// ```text
/// A.a1      -> A.a2, extern_a1
/// A.a2      -> extern_a2 (x2), B.b2
/// A.a3.a3i  -> B.b2, A.a4.a4i, extern_a3i
/// A.a4.a4i  -> B.b1, extern_a4i     (A.a4 has no __init__.py)
/// B.b1      -> B.b2, extern_b1
/// B.b2      -> C (x2), extern_b2
/// C         -> extern_C
/// ```
pub fn module_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "A/__init__.py", "");
    write(root, "A/a1.py", "import A.a2\nimport extern_a1\n");
    write(
        root,
        "A/a2.py",
        "import extern_a2\nfrom extern_a2 import something\nimport B.b2\n",
    );
    write(root, "A/a3/__init__.py", "");
    write(
        root,
        "A/a3/a3i.py",
        "import B.b2\nimport A.a4.a4i\nimport extern_a3i\n",
    );
    write(root, "A/a4/a4i.py", "import B.b1\nimport extern_a4i\n");
    write(root, "B/__init__.py", "");
    write(root, "B/b1.py", "import B.b2\nimport extern_b1\n");
    write(
        root,
        "B/b2.py",
        "import C\nfrom C import thing\nimport extern_b2\n",
    );
    write(root, "C.py", "import extern_C\n");
    dir
}

/// A tree exercising lazy imports: `heavy` is only imported inside a
/// function body, and pulls in another external dependency. `core` is
/// imported once eagerly and once more inside the same function.
pub fn lazy_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "app.py",
        "import core\n\n\ndef go():\n    import core\n    import heavy\n",
    );
    write(root, "core.py", "import extern_core\n");
    write(root, "heavy.py", "import extern_heavy\n");
    dir
}

/// A single module importing a builtin eagerly.
pub fn builtin_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "uses_os.py", "import os\nimport extern_x\n");
    dir
}

/// Scope over the whole search path, keeping unreachable modules so the
/// broken `A.a4.a4i` stays visible to resolution.
pub fn full_scope(root: &Path) -> ModuleScope {
    let mut scope = ModuleScope::new();
    scope
        .add_from_search_path(root, Some("fixture"), UnreachableMode::Keep)
        .unwrap();
    scope
}

/// A manifest-driven repository for end-to-end runs.
pub fn config_repo(manifest_body: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "src/C.py", "import extern_C\nimport os\n");
    write(root, "src/lazy_user.py", "def go():\n    import extern_lazy\n");
    write(
        root,
        "pyproject.toml",
        &format!(
            "[project]\nname = \"demo\"\ndependencies = []\n\n{manifest_body}"
        ),
    );
    let manifest = root.join("pyproject.toml");
    (dir, manifest)
}
