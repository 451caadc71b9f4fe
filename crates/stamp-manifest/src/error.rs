//! Manifest loading errors

use crate::model::EntryRef;
use stamp_symbol::NameError;

/// Malformed manifest
///
/// Entry-level variants name the offending entry as `kind[position]`.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Not a YAML mapping of the expected shape
    #[error("manifest is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Top-level `tracer` absent or empty
    #[error("manifest has no 'tracer' component")]
    MissingTracer,

    /// Field required for the entry's kind is absent
    #[error("{entry}: missing required field '{field}'")]
    MissingField {
        /// Offending entry
        entry: EntryRef,
        /// Name of the absent field
        field: &'static str,
    },

    /// `name` / `test_name` is empty
    #[error("{entry}: empty target")]
    EmptyTarget {
        /// Offending entry
        entry: EntryRef,
    },

    /// Target is not a dotted identifier path
    #[error("{entry}: invalid target: {source}")]
    InvalidTarget {
        /// Offending entry
        entry: EntryRef,
        /// Why the name was rejected
        source: NameError,
    },

    /// Version is neither a scalar nor a variant mapping of scalars
    #[error("{entry}: invalid version: {message}")]
    InvalidVersion {
        /// Offending entry
        entry: EntryRef,
        /// What was wrong
        message: String,
    },

    /// Condition clause that is not `attribute <op> value`
    #[error("{entry}: invalid condition clause '{clause}'")]
    InvalidCondition {
        /// Offending entry
        entry: EntryRef,
        /// Clause text as written
        clause: String,
    },
}

impl SchemaError {
    /// Entry the error concerns, if it is entry-level
    #[must_use]
    pub fn entry(&self) -> Option<EntryRef> {
        match self {
            Self::Yaml(_) | Self::MissingTracer => None,
            Self::MissingField { entry, .. }
            | Self::EmptyTarget { entry }
            | Self::InvalidTarget { entry, .. }
            | Self::InvalidVersion { entry, .. }
            | Self::InvalidCondition { entry, .. } => Some(*entry),
        }
    }
}
