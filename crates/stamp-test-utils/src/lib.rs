//! Testing utilities for the stamp workspace
//!
//! Shared fixtures, a scratch workspace on disk, and proptest strategies
//! for test modules.

#![allow(missing_docs)]

use proptest::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Blocking test suite with hand-written and manifest-controlled decorators
pub const BLOCKING_SOURCE: &str = include_str!("../fixtures/test_blocking.py");

/// Go manifest for [`BLOCKING_SOURCE`]
pub const GOLANG_MANIFEST: &str = include_str!("../fixtures/golang.yaml");

/// [`BLOCKING_SOURCE`] rewritten with [`GOLANG_MANIFEST`] and default config
pub const BLOCKING_GOLANG_EXPECTED: &str = include_str!("../fixtures/test_blocking.golang.py");

/// Manifest with no entries
pub const EMPTY_MANIFEST: &str = "tracer: golang\n";

/// Temporary directory holding a manifest and a target module
pub struct Workspace {
    dir: TempDir,
    /// `manifest.yaml` inside the directory
    pub manifest: PathBuf,
    /// Python module the manifest is applied to
    pub target: PathBuf,
}

impl Workspace {
    pub fn new(manifest: &str, source: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.yaml");
        let target = dir.path().join("test_module.py");
        fs::write(&manifest_path, manifest).unwrap();
        fs::write(&target, source).unwrap();
        Self {
            dir,
            manifest: manifest_path,
            target,
        }
    }

    /// Path of another file inside the workspace
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    pub fn read_target(&self) -> String {
        Self::read(&self.target)
    }

    /// Number of entries in the directory
    pub fn file_count(&self) -> usize {
        fs::read_dir(self.dir.path()).unwrap().count()
    }
}

/// Build a manifest from a tracer and YAML list sections
pub fn manifest(tracer: &str, sections: &[(&str, &str)]) -> String {
    let mut yaml = format!("tracer: {tracer}\n");
    for (kind, body) in sections {
        yaml.push_str(kind);
        yaml.push_str(":\n");
        yaml.push_str(body);
        if !body.ends_with('\n') {
            yaml.push('\n');
        }
    }
    yaml
}

// ============================================================================
// Strategies
// ============================================================================

fn identifier_suffix() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

/// Decorators as they appear in hand-written suites, controlled or not
pub fn arb_decorator() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("@coverage.basic".to_string()),
        Just("@scenarios.appsec_blocking".to_string()),
        Just(r#"@released(java="1.0", python={"flask-poc": "1.10", "*": "?"})"#.to_string()),
        Just(r#"@bug(context.library < "java@0.111.0", reason="old")"#.to_string()),
        Just(r#"@irrelevant(context.library == "ruby" and context.weblog_variant == "rack")"#.to_string()),
        Just("@missing_feature(\n    library=\"nodejs\",\n    reason=\"Not supported yet\",\n)".to_string()),
        Just("# hand-written note".to_string()),
    ]
}

fn arb_decorators() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_decorator(), 0..4)
}

fn indent_block(lines: &[String], indent: &str) -> String {
    lines
        .iter()
        .flat_map(|block| block.lines())
        .map(|line| format!("{indent}{line}\n"))
        .collect()
}

/// A test class with methods, or a top-level test function, or a helper
pub fn arb_declaration() -> impl Strategy<Value = String> {
    let method = (arb_decorators(), identifier_suffix()).prop_map(|(decorators, name)| {
        format!(
            "{}    def test_{name}(self):\n        assert True\n",
            indent_block(&decorators, "    ")
        )
    });
    let class = (
        arb_decorators(),
        prop::sample::select(vec!["Test_Alpha", "Test_Beta", "Test_Gamma"]),
        prop::collection::vec(method, 1..3),
    )
        .prop_map(|(decorators, name, methods)| {
            format!(
                "{}class {name}:\n    \"\"\"Suite\"\"\"\n\n{}",
                indent_block(&decorators, ""),
                methods.join("\n")
            )
        });
    let function = (arb_decorators(), identifier_suffix()).prop_map(|(decorators, name)| {
        format!("{}def test_{name}():\n    pass\n", indent_block(&decorators, ""))
    });
    let helper = identifier_suffix().prop_map(|name| format!("def _{name}(x):\n    return x\n"));
    prop_oneof![class, function, helper]
}

/// Module text made of declarations separated by blank lines
///
/// Names may repeat; callers that need unique names should filter.
pub fn arb_module() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_declaration(), 0..4)
        .prop_map(|declarations| format!("from utils import released\n\n\n{}", declarations.join("\n\n")))
}
