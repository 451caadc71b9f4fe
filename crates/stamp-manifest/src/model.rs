//! Manifest entry model

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use stamp_symbol::QualifiedName;
use std::fmt::{self, Display, Formatter};

/// Variant key standing for "every other variant"
pub const WILDCARD_VARIANT: &str = "*";

/// Kind of a manifest declaration, one per controlled decorator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Version at which the test starts to pass
    Released,
    /// Test does not apply to a context
    Irrelevant,
    /// Test fails because of a known bug
    Bug,
    /// Test needs a feature the component lacks
    MissingFeature,
}

impl EntryKind {
    /// All kinds, in emission order
    pub const ALL: [Self; 4] = [Self::Released, Self::Irrelevant, Self::Bug, Self::MissingFeature];

    /// Name of the decorator this kind controls
    #[inline]
    #[must_use]
    pub fn decorator_name(self) -> &'static str {
        match self {
            Self::Released => "released",
            Self::Irrelevant => "irrelevant",
            Self::Bug => "bug",
            Self::MissingFeature => "missing_feature",
        }
    }

    /// Kind controlling a decorator name, if any
    #[must_use]
    pub fn from_decorator_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.decorator_name() == name)
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.decorator_name())
    }
}

/// Position of an entry in the manifest, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    /// List the entry was declared in
    pub kind: EntryKind,
    /// 0-based index within the kind's list
    pub position: usize,
}

impl Display for EntryRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.position)
    }
}

/// Version data of a released entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// One version for every variant
    Single(String),
    /// Variant name → version, in authored order
    PerVariant(IndexMap<String, String>),
}

/// `attribute <operator> value`
///
/// The operator is kept as written; whether it is supported is decided when
/// annotations are synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionClause {
    /// Context attribute, without the `context.` prefix
    pub attribute: String,
    /// Operator with internal whitespace collapsed (`not in`)
    pub operator: String,
    /// Compared value, unquoted
    pub value: String,
}

impl ConditionClause {
    /// Create a clause
    #[inline]
    #[must_use]
    pub fn new(attribute: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

impl Display for ConditionClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.operator, self.value)
    }
}

static CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:context\.)?(?P<attribute>[A-Za-z_][A-Za-z0-9_]*)\s*(?P<operator>not\s+in\b|is\s+not\b|in\b|is\b|[!=<>~^]+)\s*(?P<value>\S.*)$",
    )
    .expect("clause pattern is valid")
});

static AND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+and\s+").expect("and pattern is valid"));

/// One quoted literal, or one bare token free of quotes, operators and brackets
static VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:"[^"]*"|'[^']*'|[^\s"'=<>!~^(),\[\]]+)$"#).expect("value pattern is valid")
});

/// Conjunction of clauses scoping an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    clauses: Vec<ConditionClause>,
}

impl Condition {
    /// Create from clauses
    #[inline]
    #[must_use]
    pub fn new(clauses: Vec<ConditionClause>) -> Self {
        Self { clauses }
    }

    /// `library == <component>`
    #[must_use]
    pub fn component_scope(component: &str) -> Self {
        Self::new(vec![ConditionClause::new("library", "==", component)])
    }

    /// Parse `attr op value [and attr op value ...]`
    ///
    /// Values may be quoted; an attribute may carry a `context.` prefix.
    /// A value is a single literal, so `or` and chained comparisons are
    /// rejected. Returns the offending clause text on failure.
    pub fn parse(text: &str) -> Result<Self, String> {
        let clauses = AND
            .split(text.trim())
            .map(|clause| {
                let captures = CLAUSE.captures(clause.trim()).ok_or_else(|| clause.to_string())?;
                let value = captures["value"].trim();
                if !VALUE.is_match(value) {
                    return Err(clause.trim().to_string());
                }
                Ok(ConditionClause::new(
                    &captures["attribute"],
                    captures["operator"].split_whitespace().collect::<Vec<_>>().join(" "),
                    unquote(value),
                ))
            })
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Self::new(clauses))
    }

    /// Clauses in authored order
    #[inline]
    #[must_use]
    pub fn clauses(&self) -> &[ConditionClause] {
        &self.clauses
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryData {
    /// `released`: version facts
    Released {
        /// Versions, single or per variant
        version: VersionSpec,
    },
    /// `irrelevant` / `bug` / `missing_feature`: scoped status with a reason
    Status {
        /// Extra scoping beyond the component, if any
        condition: Option<Condition>,
        /// Why the status holds
        reason: String,
    },
}

/// One manifest declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Decorator the entry controls
    pub kind: EntryKind,
    /// Test the entry applies to (dotted or bare)
    pub target: QualifiedName,
    /// Runtime/variant family the entry concerns
    pub component: String,
    /// Kind-specific payload
    pub data: EntryData,
    /// Where the entry was declared
    pub origin: EntryRef,
}

impl ManifestEntry {
    /// Version data (released entries only)
    #[must_use]
    pub fn version(&self) -> Option<&VersionSpec> {
        match &self.data {
            EntryData::Released { version } => Some(version),
            EntryData::Status { .. } => None,
        }
    }

    /// Scoping condition (status entries only)
    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        match &self.data {
            EntryData::Status { condition, .. } => condition.as_ref(),
            EntryData::Released { .. } => None,
        }
    }

    /// Reason text (status entries only)
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match &self.data {
            EntryData::Status { reason, .. } => Some(reason),
            EntryData::Released { .. } => None,
        }
    }
}

impl Display for ManifestEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.origin, self.target)
    }
}
