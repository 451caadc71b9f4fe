//! End-to-end runs against files on disk

use pretty_assertions::assert_eq;
use stamp_rewrite::{rewrite_file, rewrite_source, RewriteConfig, RewriteError, RewriteOptions, RewriteReport};
use stamp_symbol::QualifiedName;
use stamp_test_utils::{manifest, Workspace, BLOCKING_GOLANG_EXPECTED, BLOCKING_SOURCE, EMPTY_MANIFEST, GOLANG_MANIFEST};

#[test]
fn blocking_suite_matches_golden_output() {
    let result = rewrite_source(GOLANG_MANIFEST.as_bytes(), BLOCKING_SOURCE, &RewriteConfig::default()).unwrap();
    assert_eq!(result.output, BLOCKING_GOLANG_EXPECTED);
    assert_eq!(
        result.report,
        RewriteReport {
            declarations: 7,
            rewritten: 5,
            placeholders: 1,
            unmatched: vec![],
            changed: true,
        }
    );
}

#[test]
fn in_place_rewrite() {
    let ws = Workspace::new(GOLANG_MANIFEST, BLOCKING_SOURCE);
    let report = rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &RewriteConfig::default()).unwrap();
    assert!(report.changed);
    assert_eq!(ws.read_target(), BLOCKING_GOLANG_EXPECTED);
    assert_eq!(ws.file_count(), 2);
}

#[test]
fn second_run_changes_nothing() {
    let ws = Workspace::new(GOLANG_MANIFEST, BLOCKING_SOURCE);
    let config = RewriteConfig::default();
    rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &config).unwrap();
    let report = rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &config).unwrap();
    assert!(!report.changed);
    assert_eq!(report.rewritten, 0);
    assert_eq!(ws.read_target(), BLOCKING_GOLANG_EXPECTED);
}

#[test]
fn output_path_leaves_target_alone() {
    let ws = Workspace::new(GOLANG_MANIFEST, BLOCKING_SOURCE);
    let output = ws.path("out.py");
    let options = RewriteOptions::default().with_output(&output);
    rewrite_file(&ws.manifest, &ws.target, &options, &RewriteConfig::default()).unwrap();
    assert_eq!(ws.read_target(), BLOCKING_SOURCE);
    assert_eq!(Workspace::read(&output), BLOCKING_GOLANG_EXPECTED);
}

#[test]
fn check_mode_writes_nothing() {
    let ws = Workspace::new(GOLANG_MANIFEST, BLOCKING_SOURCE);
    let options = RewriteOptions::default().with_check(true);
    let report = rewrite_file(&ws.manifest, &ws.target, &options, &RewriteConfig::default()).unwrap();
    assert!(report.changed);
    assert_eq!(ws.read_target(), BLOCKING_SOURCE);
}

#[test]
fn failures_leave_target_untouched() {
    let source = "class Test_A:\n    def test_b(self):\n        pass\n";

    // malformed manifest
    let ws = Workspace::new("tracer: golang\nbug:\n  - name: test_b\n", source);
    let err = rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &RewriteConfig::default())
        .unwrap_err();
    assert!(matches!(err, RewriteError::Schema(_)));
    assert_eq!(ws.read_target(), source);

    // unsupported operator
    let yaml = manifest("golang", &[("bug", "  - name: test_b\n    condition: library ~= golang\n    reason: x")]);
    let ws = Workspace::new(&yaml, source);
    let err = rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &RewriteConfig::default())
        .unwrap_err();
    assert!(matches!(err, RewriteError::Synthesis(_)));
    assert_eq!(ws.read_target(), source);

    // duplicate declaration
    let duplicated = "def test_a():\n    pass\n\ndef test_a():\n    pass\n";
    let ws = Workspace::new(EMPTY_MANIFEST, duplicated);
    let err = rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &RewriteConfig::default())
        .unwrap_err();
    assert!(matches!(err, RewriteError::Resolve(_)));
    assert_eq!(ws.read_target(), duplicated);
}

#[test]
fn strict_mode_rejects_unmatched_targets() {
    let yaml = manifest("golang", &[("irrelevant", "  - name: Test_Missing.test_x\n    reason: gone")]);
    let ws = Workspace::new(&yaml, BLOCKING_SOURCE);
    let config = RewriteConfig::default().with_strict(true);
    let err = rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &config).unwrap_err();
    let RewriteError::UnmatchedTargets(names) = err else {
        panic!("expected unmatched targets");
    };
    assert_eq!(names, vec!["Test_Missing.test_x".parse::<QualifiedName>().unwrap()]);
    assert_eq!(ws.read_target(), BLOCKING_SOURCE);
}

#[test]
fn missing_inputs_are_io_errors() {
    let ws = Workspace::new(EMPTY_MANIFEST, "x = 1\n");
    let err = rewrite_file(
        &ws.path("nope.yaml"),
        &ws.target,
        &RewriteOptions::default(),
        &RewriteConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RewriteError::Io { ref path, .. } if path.ends_with("nope.yaml")));
}

#[test]
fn qualified_target_does_not_touch_same_named_function() {
    let source = "\
def test_bar():
    pass


class Test_Foo:
    def test_bar(self):
        pass
";
    let yaml = manifest("golang", &[("bug", "  - name: Test_Foo.test_bar\n    reason: flaky")]);
    let config = RewriteConfig::default().with_default_release(false);
    let result = rewrite_source(yaml.as_bytes(), source, &config).unwrap();
    assert_eq!(
        result.output,
        "\
def test_bar():
    pass


class Test_Foo:
    @bug(context.library == \"golang\", reason=\"flaky\")
    def test_bar(self):
        pass
"
    );
}

#[test]
fn bare_target_reaches_every_declaration_with_that_name() {
    let source = "\
def test_bar():
    pass


class Test_Foo:
    def test_bar(self):
        pass
";
    let yaml = manifest("golang", &[("bug", "  - name: test_bar\n    reason: flaky")]);
    let config = RewriteConfig::default().with_default_release(false);
    let result = rewrite_source(yaml.as_bytes(), source, &config).unwrap();
    assert_eq!(result.output.matches("@bug(").count(), 2);
    assert_eq!(result.report.rewritten, 2);
}

#[test]
fn existing_unrelated_decorator_comes_first() {
    let source = "@coverage.basic\ndef test_path_params():\n    pass\n";
    let yaml = manifest(
        "golang",
        &[(
            "irrelevant",
            "  - name: test_path_params\n    condition: library == golang and weblog_variant == net-http\n    reason: no router",
        )],
    );
    let result = rewrite_source(yaml.as_bytes(), source, &RewriteConfig::default()).unwrap();
    assert_eq!(
        result.output,
        "@coverage.basic\n@irrelevant(context.library == \"golang\" and context.weblog_variant == \"net-http\", reason=\"no router\")\ndef test_path_params():\n    pass\n"
    );
}

#[test]
fn class_with_release_gets_no_placeholder() {
    let source = "class Test_A:\n    pass\n\n\nclass Test_B:\n    pass\n";
    let yaml = manifest("golang", &[("released", "  - name: Test_A\n    version: '1.2.0'")]);
    let result = rewrite_source(yaml.as_bytes(), source, &RewriteConfig::default()).unwrap();
    assert_eq!(
        result.output,
        "@released(golang=\"1.2.0\")\nclass Test_A:\n    pass\n\n\n@released(golang=\"?\")\nclass Test_B:\n    pass\n"
    );
    assert_eq!(result.report.placeholders, 1);
}

#[test]
fn config_file_changes_naming() {
    let ws = Workspace::new(
        &manifest("golang", &[("bug", "  - name: check_a\n    reason: x")]),
        "def check_a():\n    pass\n",
    );
    let config_path = ws.write("stamp.toml", "[naming]\nfunction_prefix = \"check_\"\n");
    let config = RewriteConfig::load(&config_path).unwrap();
    rewrite_file(&ws.manifest, &ws.target, &RewriteOptions::default(), &config).unwrap();
    assert_eq!(
        ws.read_target(),
        "@bug(context.library == \"golang\", reason=\"x\")\ndef check_a():\n    pass\n"
    );
}
