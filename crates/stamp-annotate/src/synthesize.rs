//! Manifest entry → annotation record
//!
//! Records for one target are ordered released, irrelevant, bug,
//! missing_feature; entries of the same kind keep manifest list order.

use crate::error::SynthesisError;
use crate::record::{AnnotationRecord, Comparison, RecordArg, RecordValue};
use indexmap::IndexMap;
use stamp_manifest::{Condition, EntryData, EntryKind, Manifest, ManifestEntry, VersionSpec};
use stamp_syntax::CompOp;
use stamp_symbol::QualifiedName;
use std::collections::HashMap;
use tracing::debug;

/// Records grouped by manifest target, targets in first-mention order
pub type Plan = IndexMap<QualifiedName, Vec<AnnotationRecord>>;

/// Keyword for the reason argument
const REASON: &str = "reason";

/// Encode one entry
///
/// # Errors
/// Returns `SynthesisError` if a condition uses an operator other than
/// `== != < <= > >=`, a released component is not an identifier, or a
/// variant mapping is empty or has an empty variant name.
pub fn synthesize(entry: &ManifestEntry) -> Result<AnnotationRecord, SynthesisError> {
    let args = match &entry.data {
        EntryData::Released { version } => {
            if !is_identifier(&entry.component) {
                return Err(SynthesisError::InvalidKeyword {
                    entry: entry.origin,
                    target: entry.target.clone(),
                    keyword: entry.component.clone(),
                });
            }
            vec![RecordArg::keyword(&entry.component, version_value(entry, version)?)]
        }
        EntryData::Status { condition, reason } => {
            let mut args = Vec::with_capacity(2);
            if let Some(condition) = condition {
                args.push(RecordArg::positional(condition_value(entry, condition)?));
            }
            args.push(RecordArg::keyword(REASON, RecordValue::Str(reason.clone())));
            args
        }
    };
    Ok(AnnotationRecord::new(entry.kind, &entry.component, args, Some(entry.origin)))
}

/// Encode every entry of a manifest, grouped by target
///
/// # Errors
/// Propagates [`synthesize`] errors and rejects a second released entry for
/// the same target and component.
pub fn plan(manifest: &Manifest) -> Result<Plan, SynthesisError> {
    let mut plan = Plan::new();
    for entry in manifest.entries() {
        let record = synthesize(entry)?;
        plan.entry(entry.target.clone()).or_default().push(record);
    }
    for (target, records) in &mut plan {
        order_records(records);
        check_releases(target, records)?;
    }
    debug!(targets = plan.len(), entries = manifest.len(), "synthesized annotation records");
    Ok(plan)
}

/// Stable sort into emission order
pub fn order_records(records: &mut [AnnotationRecord]) {
    records.sort_by_key(AnnotationRecord::kind);
}

/// Reject two released records for one component
///
/// # Errors
/// Returns `SynthesisError::DuplicateRelease` naming both entries.
pub fn check_releases(target: &QualifiedName, records: &[AnnotationRecord]) -> Result<(), SynthesisError> {
    let mut seen = HashMap::new();
    let released = records
        .iter()
        .filter(|record| record.kind() == EntryKind::Released)
        .filter_map(|record| Some((record.component(), record.origin()?)));
    for (component, origin) in released {
        if let Some(first) = seen.insert(component, origin) {
            return Err(SynthesisError::DuplicateRelease {
                target: target.clone(),
                component: component.to_string(),
                first,
                second: origin,
            });
        }
    }
    Ok(())
}

fn version_value(entry: &ManifestEntry, version: &VersionSpec) -> Result<RecordValue, SynthesisError> {
    match version {
        VersionSpec::Single(version) => Ok(RecordValue::Str(version.clone())),
        VersionSpec::PerVariant(variants) => {
            let malformed = |message: &str| SynthesisError::MalformedVariantMapping {
                entry: entry.origin,
                target: entry.target.clone(),
                message: message.to_string(),
            };
            if variants.is_empty() {
                return Err(malformed("no variants"));
            }
            if variants.keys().any(|variant| variant.trim().is_empty()) {
                return Err(malformed("empty variant name"));
            }
            Ok(RecordValue::Mapping(variants.clone()))
        }
    }
}

fn condition_value(entry: &ManifestEntry, condition: &Condition) -> Result<RecordValue, SynthesisError> {
    condition
        .clauses()
        .iter()
        .map(|clause| {
            let op = supported_operator(&clause.operator).ok_or_else(|| SynthesisError::UnsupportedOperator {
                entry: entry.origin,
                target: entry.target.clone(),
                operator: clause.operator.clone(),
            })?;
            Ok(Comparison {
                attribute: clause.attribute.clone(),
                op,
                literal: clause.value.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(RecordValue::Condition)
}

fn supported_operator(symbol: &str) -> Option<CompOp> {
    CompOp::from_symbol(symbol).filter(|op| {
        matches!(
            op,
            CompOp::Eq | CompOp::NotEq | CompOp::Lt | CompOp::LtE | CompOp::Gt | CompOp::GtE
        )
    })
}

pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manifest(yaml: &str) -> Manifest {
        Manifest::load(yaml.as_bytes()).unwrap()
    }

    fn rendered(records: &[AnnotationRecord]) -> Vec<String> {
        records.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn released_single_version() {
        let m = manifest("tracer: golang\nreleased:\n  - name: Test_A\n    version: '1.51.0'\n");
        let record = synthesize(&m.entries()[0]).unwrap();
        assert_eq!(record.function_name(), "released");
        assert_eq!(record.to_string(), r#"@released(golang="1.51.0")"#);
    }

    #[test]
    fn variant_mapping_is_preserved() {
        let m = manifest(
            "tracer: python\nreleased:\n  - name: Test_A\n    version: {a: '1.0', b: '2.0', '*': '?'}\n",
        );
        let record = synthesize(&m.entries()[0]).unwrap();
        let [RecordArg {
            keyword: Some(keyword),
            value: RecordValue::Mapping(pairs),
        }] = record.args()
        else {
            panic!("expected one mapping keyword argument");
        };
        assert_eq!(keyword, "python");
        let pairs: Vec<_> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("a", "1.0"), ("b", "2.0"), ("*", "?")]);
        assert_eq!(record.to_string(), r#"@released(python={"a": "1.0", "b": "2.0", "*": "?"})"#);
    }

    #[test]
    fn irrelevant_with_condition_and_reason() {
        let m = manifest(
            "tracer: golang\nirrelevant:\n  - name: test_path_params\n    condition: library == golang and weblog_variant == net-http\n    reason: Not supported\n",
        );
        let record = synthesize(&m.entries()[0]).unwrap();
        assert_eq!(
            record.to_string(),
            r#"@irrelevant(context.library == "golang" and context.weblog_variant == "net-http", reason="Not supported")"#
        );
    }

    #[test]
    fn status_without_condition_is_component_scoped() {
        let m = manifest("tracer: ruby\nbug:\n  - name: test_a\n    reason: flaky\n");
        let record = synthesize(&m.entries()[0]).unwrap();
        assert_eq!(record.to_string(), r#"@bug(context.library == "ruby", reason="flaky")"#);
    }

    #[test]
    fn status_without_scope_has_only_reason() {
        let m = manifest("tracer: ruby\nscope_to_component: false\nmissing_feature:\n  - name: test_a\n    reason: later\n");
        let record = synthesize(&m.entries()[0]).unwrap();
        assert_eq!(record.to_string(), r#"@missing_feature(reason="later")"#);
    }

    #[test]
    fn unsupported_operator_is_error() {
        let m = manifest("tracer: golang\nbug:\n  - name: test_a\n    condition: library in golang\n    reason: x\n");
        let err = synthesize(&m.entries()[0]).unwrap_err();
        assert!(matches!(err, SynthesisError::UnsupportedOperator { ref operator, .. } if operator == "in"));

        let m = manifest("tracer: golang\nbug:\n  - name: test_a\n    condition: library =~ golang\n    reason: x\n");
        assert!(synthesize(&m.entries()[0]).is_err());
    }

    #[test]
    fn component_must_be_keyword() {
        let m = manifest("tracer: golang\nreleased:\n  - name: Test_A\n    component: php-appsec\n    version: '1'\n");
        let err = synthesize(&m.entries()[0]).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidKeyword { ref keyword, .. } if keyword == "php-appsec"));
    }

    #[test]
    fn empty_variant_name_is_error() {
        let m = manifest("tracer: golang\nreleased:\n  - name: Test_A\n    version: {'': '1'}\n");
        let err = synthesize(&m.entries()[0]).unwrap_err();
        assert!(matches!(err, SynthesisError::MalformedVariantMapping { .. }));
    }

    #[test]
    fn plan_orders_released_first_then_manifest_order() {
        let m = manifest(
            "tracer: golang
irrelevant:
  - name: Test_A
    condition: weblog_variant == gin
    reason: first
  - name: Test_B
    reason: other
  - name: Test_A
    condition: weblog_variant == echo
    reason: second
released:
  - name: Test_A
    version: '1.0'
",
        );
        let plan = plan(&m).unwrap();
        let targets: Vec<String> = plan.keys().map(ToString::to_string).collect();
        assert_eq!(targets, vec!["Test_A", "Test_B"]);
        assert_eq!(
            rendered(&plan[&QualifiedName::single("Test_A")]),
            vec![
                r#"@released(golang="1.0")"#,
                r#"@irrelevant(context.weblog_variant == "gin", reason="first")"#,
                r#"@irrelevant(context.weblog_variant == "echo", reason="second")"#,
            ]
        );
    }

    #[test]
    fn plan_rejects_duplicate_release() {
        let m = manifest(
            "tracer: golang\nreleased:\n  - name: Test_A\n    version: '1.0'\n  - name: Test_A\n    version: '2.0'\n",
        );
        let err = plan(&m).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'Test_A' is released twice for 'golang' (released[0] and released[1])"
        );
    }

    #[test]
    fn releases_for_distinct_components_coexist() {
        let m = manifest(
            "tracer: golang\nreleased:\n  - name: Test_A\n    version: '1.0'\n  - name: Test_A\n    component: java\n    version: '2.0'\n",
        );
        let plan = plan(&m).unwrap();
        assert_eq!(plan[&QualifiedName::single("Test_A")].len(), 2);
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("php_appsec"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
