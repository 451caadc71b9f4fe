//! YAML manifest loading
//!
//! Deserializes into loose `Raw*` shapes with serde, then validates each
//! entry into a [`ManifestEntry`]. Entries come out grouped by kind in
//! [`EntryKind::ALL`] order, each group in list order.

use crate::error::SchemaError;
use crate::model::{
    Condition, ConditionClause, EntryData, EntryKind, EntryRef, ManifestEntry, VersionSpec,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use stamp_symbol::QualifiedName;

#[derive(Debug, Deserialize)]
struct RawManifest {
    tracer: Option<String>,
    #[serde(default = "default_scope_to_component")]
    scope_to_component: bool,
    #[serde(default)]
    released: Vec<RawEntry>,
    #[serde(default)]
    irrelevant: Vec<RawEntry>,
    #[serde(default)]
    bug: Vec<RawEntry>,
    #[serde(default)]
    missing_feature: Vec<RawEntry>,
}

fn default_scope_to_component() -> bool {
    true
}

impl RawManifest {
    fn list(&self, kind: EntryKind) -> &[RawEntry] {
        match kind {
            EntryKind::Released => &self.released,
            EntryKind::Irrelevant => &self.irrelevant,
            EntryKind::Bug => &self.bug,
            EntryKind::MissingFeature => &self.missing_feature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(alias = "test_name")]
    name: Option<String>,
    component: Option<String>,
    version: Option<Value>,
    condition: Option<RawCondition>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Text(String),
    Clause(RawClause),
    All(Vec<RawClause>),
}

#[derive(Debug, Deserialize)]
struct RawClause {
    attribute: String,
    #[serde(alias = "operator")]
    op: String,
    value: Value,
}

/// A validated manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    component: String,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Create from already validated entries
    #[must_use]
    pub fn new(component: impl Into<String>, entries: Vec<ManifestEntry>) -> Self {
        Self {
            component: component.into(),
            entries,
        }
    }

    /// Parse and validate a YAML manifest
    ///
    /// # Errors
    /// Returns `SchemaError` if the document is not YAML of the expected
    /// shape, `tracer` is absent, or any entry lacks a field its kind
    /// requires or carries an unusable target, version or condition.
    pub fn load(bytes: &[u8]) -> Result<Self, SchemaError> {
        let raw: RawManifest = serde_yaml::from_slice(bytes)?;
        let component = raw
            .tracer
            .as_deref()
            .map(str::trim)
            .filter(|tracer| !tracer.is_empty())
            .ok_or(SchemaError::MissingTracer)?
            .to_string();

        let mut entries = Vec::new();
        for kind in EntryKind::ALL {
            for (position, entry) in raw.list(kind).iter().enumerate() {
                let origin = EntryRef { kind, position };
                entries.push(validate(entry, origin, &component, raw.scope_to_component)?);
            }
        }
        Ok(Self { component, entries })
    }

    /// Default component (`tracer`)
    #[inline]
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// All entries, grouped by kind
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the manifest declares nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate(
    raw: &RawEntry,
    origin: EntryRef,
    default_component: &str,
    scope_to_component: bool,
) -> Result<ManifestEntry, SchemaError> {
    let name = raw.name.as_deref().ok_or(SchemaError::MissingField {
        entry: origin,
        field: "name",
    })?;
    if name.trim().is_empty() {
        return Err(SchemaError::EmptyTarget { entry: origin });
    }
    let target: QualifiedName = name
        .parse()
        .map_err(|source| SchemaError::InvalidTarget { entry: origin, source })?;

    let component = raw
        .component
        .as_deref()
        .map(str::trim)
        .filter(|component| !component.is_empty())
        .unwrap_or(default_component)
        .to_string();

    let data = if origin.kind == EntryKind::Released {
        let version = raw.version.as_ref().ok_or(SchemaError::MissingField {
            entry: origin,
            field: "version",
        })?;
        EntryData::Released {
            version: version_spec(version, origin)?,
        }
    } else {
        let reason = raw.reason.clone().ok_or(SchemaError::MissingField {
            entry: origin,
            field: "reason",
        })?;
        let condition = match &raw.condition {
            Some(condition) => condition_of(condition, origin)?,
            None => None,
        };
        let condition = match condition {
            None if scope_to_component => Some(Condition::component_scope(&component)),
            condition => condition,
        };
        EntryData::Status { condition, reason }
    };

    Ok(ManifestEntry {
        kind: origin.kind,
        target,
        component,
        data,
        origin,
    })
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(number.to_string()),
        _ => None,
    }
}

/// A version as text
///
/// YAML reads `1.10` as the float `1.1`, so only integers are taken as
/// numbers. `Ok(None)` means the value is not a scalar at all.
fn version_text(value: &Value, entry: EntryRef) -> Result<Option<String>, SchemaError> {
    match value {
        Value::Number(number) if number.is_f64() => Err(SchemaError::InvalidVersion {
            entry,
            message: format!("{number} is read as a number, quote the version"),
        }),
        _ => Ok(scalar(value)),
    }
}

fn version_spec(value: &Value, entry: EntryRef) -> Result<VersionSpec, SchemaError> {
    if let Some(version) = version_text(value, entry)? {
        return Ok(VersionSpec::Single(version));
    }
    let Value::Mapping(mapping) = value else {
        return Err(SchemaError::InvalidVersion {
            entry,
            message: "expected a version string or a variant mapping".to_string(),
        });
    };
    if mapping.is_empty() {
        return Err(SchemaError::InvalidVersion {
            entry,
            message: "variant mapping is empty".to_string(),
        });
    }

    let mut variants = IndexMap::with_capacity(mapping.len());
    for (key, version) in mapping {
        let variant = scalar(key).ok_or_else(|| SchemaError::InvalidVersion {
            entry,
            message: "variant names must be strings".to_string(),
        })?;
        let version = version_text(version, entry)?.ok_or_else(|| SchemaError::InvalidVersion {
            entry,
            message: format!("version of variant '{variant}' must be a string"),
        })?;
        variants.insert(variant, version);
    }
    Ok(VersionSpec::PerVariant(variants))
}

fn condition_of(raw: &RawCondition, entry: EntryRef) -> Result<Option<Condition>, SchemaError> {
    let clauses = match raw {
        RawCondition::Text(text) => {
            return Condition::parse(text)
                .map(Some)
                .map_err(|clause| SchemaError::InvalidCondition { entry, clause });
        }
        RawCondition::Clause(clause) => vec![clause_of(clause, entry)?],
        RawCondition::All(clauses) => clauses
            .iter()
            .map(|clause| clause_of(clause, entry))
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok((!clauses.is_empty()).then(|| Condition::new(clauses)))
}

fn clause_of(raw: &RawClause, entry: EntryRef) -> Result<ConditionClause, SchemaError> {
    let invalid = || SchemaError::InvalidCondition {
        entry,
        clause: format!("{} {} {:?}", raw.attribute, raw.op, raw.value),
    };
    let attribute = raw.attribute.trim();
    let attribute = attribute.strip_prefix("context.").unwrap_or(attribute);
    if attribute.is_empty() || raw.op.trim().is_empty() {
        return Err(invalid());
    }
    let value = scalar(&raw.value).ok_or_else(invalid)?;
    Ok(ConditionClause::new(
        attribute,
        raw.op.split_whitespace().collect::<Vec<_>>().join(" "),
        value,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
tracer: golang
owner: "@team"
released:
  - name: Test_BlockingAddresses
    version: "1.51.0"
  - test_name: Test_Suspicious
    component: java
    version:
      spring-boot: "0.110.0"
      sinatra: "1.5"
      "*": "?"
irrelevant:
  - test_name: test_path_params
    condition: "library == golang and weblog_variant == net-http"
    reason: "Not supported by the router"
  - name: Test_Foo.test_bar
    reason: "other runtime"
bug:
  - name: Test_Foo
    condition:
      attribute: context.library
      op: "<"
      value: "java@0.111.0"
    reason: "handler"
"#;

    fn manifest() -> Manifest {
        Manifest::load(MANIFEST.as_bytes()).unwrap()
    }

    #[test]
    fn entries_grouped_by_kind_in_list_order() {
        let manifest = manifest();
        assert_eq!(manifest.component(), "golang");
        let order: Vec<String> = manifest.entries().iter().map(ToString::to_string).collect();
        assert_eq!(
            order,
            vec![
                "released[0] (Test_BlockingAddresses)",
                "released[1] (Test_Suspicious)",
                "irrelevant[0] (test_path_params)",
                "irrelevant[1] (Test_Foo.test_bar)",
                "bug[0] (Test_Foo)",
            ]
        );
    }

    #[test]
    fn released_versions() {
        let manifest = manifest();
        let entries = manifest.entries();
        assert_eq!(entries[0].component, "golang");
        assert_eq!(entries[0].version(), Some(&VersionSpec::Single("1.51.0".to_string())));

        assert_eq!(entries[1].component, "java");
        let Some(VersionSpec::PerVariant(variants)) = entries[1].version() else {
            panic!("expected per-variant version");
        };
        let pairs: Vec<_> = variants.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("spring-boot", "0.110.0"), ("sinatra", "1.5"), ("*", "?")]);
    }

    #[test]
    fn string_condition_is_split_into_clauses() {
        let manifest = manifest();
        let entry = &manifest.entries()[2];
        assert_eq!(entry.reason(), Some("Not supported by the router"));
        let clauses: Vec<String> = entry
            .condition()
            .unwrap()
            .clauses()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(clauses, vec!["library == golang", "weblog_variant == net-http"]);
    }

    #[test]
    fn missing_condition_is_scoped_to_component() {
        let manifest = manifest();
        let entry = &manifest.entries()[3];
        assert_eq!(entry.condition(), Some(&Condition::component_scope("golang")));
    }

    #[test]
    fn mapping_condition() {
        let manifest = manifest();
        let entry = &manifest.entries()[4];
        assert_eq!(
            entry.condition().unwrap().clauses(),
            &[ConditionClause::new("library", "<", "java@0.111.0")]
        );
    }

    #[test]
    fn scope_to_component_can_be_disabled() {
        let yaml = "tracer: ruby\nscope_to_component: false\nbug:\n  - name: test_a\n    reason: flaky\n";
        let manifest = Manifest::load(yaml.as_bytes()).unwrap();
        assert_eq!(manifest.entries()[0].condition(), None);
    }

    #[test]
    fn absent_lists_are_empty() {
        let manifest = Manifest::load(b"tracer: php\n").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn missing_tracer() {
        let err = Manifest::load(b"released: []\n").unwrap_err();
        assert!(matches!(err, SchemaError::MissingTracer));
    }

    #[test]
    fn missing_reason_names_the_entry() {
        let yaml = "tracer: golang\nirrelevant:\n  - name: test_a\n  - name: test_b\n    condition: library == golang\n";
        let err = Manifest::load(yaml.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "irrelevant[0]: missing required field 'reason'");
        assert_eq!(
            err.entry(),
            Some(EntryRef {
                kind: EntryKind::Irrelevant,
                position: 0
            })
        );
    }

    #[test]
    fn missing_version() {
        let err = Manifest::load(b"tracer: golang\nreleased:\n  - name: Test_A\n").unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { field: "version", .. }));
    }

    #[test]
    fn empty_and_invalid_targets() {
        let err = Manifest::load(b"tracer: golang\nreleased:\n  - name: ' '\n    version: '1.0'\n").unwrap_err();
        assert!(matches!(err, SchemaError::EmptyTarget { .. }));

        let err = Manifest::load(b"tracer: golang\nreleased:\n  - name: Test_A..b\n    version: '1.0'\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidTarget { .. }));
    }

    #[test]
    fn invalid_versions() {
        let err = Manifest::load(b"tracer: golang\nreleased:\n  - name: Test_A\n    version: [1, 2]\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidVersion { .. }));

        let err = Manifest::load(b"tracer: golang\nreleased:\n  - name: Test_A\n    version: {}\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidVersion { .. }));

        let err =
            Manifest::load(b"tracer: golang\nreleased:\n  - name: Test_A\n    version:\n      a: [1]\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidVersion { .. }));
    }

    #[test]
    fn fractional_versions_must_be_quoted() {
        for version in ["1.10", "2.0"] {
            let yaml = format!("tracer: golang\nreleased:\n  - name: Test_A\n    version: {version}\n");
            let err = Manifest::load(yaml.as_bytes()).unwrap_err();
            assert!(
                matches!(err, SchemaError::InvalidVersion { ref message, .. } if message.contains("quote the version")),
                "{err}"
            );
        }

        let yaml = "tracer: java\nreleased:\n  - name: Test_A\n    version:\n      spring-boot: 1.10\n";
        assert!(matches!(
            Manifest::load(yaml.as_bytes()).unwrap_err(),
            SchemaError::InvalidVersion { .. }
        ));

        let manifest = Manifest::load(b"tracer: golang\nreleased:\n  - name: Test_A\n    version: \"1.10\"\n").unwrap();
        assert_eq!(manifest.entries()[0].version(), Some(&VersionSpec::Single("1.10".to_string())));
    }

    #[test]
    fn integer_versions_are_accepted() {
        let manifest = Manifest::load(b"tracer: golang\nreleased:\n  - name: Test_A\n    version: 2\n").unwrap();
        assert_eq!(manifest.entries()[0].version(), Some(&VersionSpec::Single("2".to_string())));
    }

    #[test]
    fn disjunctive_condition_is_rejected() {
        let yaml = "tracer: golang\nbug:\n  - name: test_a\n    condition: library == golang or library == java\n    reason: x\n";
        let err = Manifest::load(yaml.as_bytes()).unwrap_err();
        assert!(
            matches!(err, SchemaError::InvalidCondition { ref clause, .. } if clause == "library == golang or library == java"),
            "{err}"
        );
    }

    #[test]
    fn invalid_condition_clause() {
        let yaml = "tracer: golang\nbug:\n  - name: test_a\n    condition: library\n    reason: x\n";
        let err = Manifest::load(yaml.as_bytes()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidCondition { ref clause, .. } if clause == "library"));
    }

    #[test]
    fn malformed_yaml() {
        let err = Manifest::load(b"tracer: [unclosed\n").unwrap_err();
        assert!(matches!(err, SchemaError::Yaml(_)));
    }
}
