//! Error types for annotation synthesis

use stamp_manifest::EntryRef;
use stamp_symbol::QualifiedName;

/// Manifest value that cannot be encoded as an annotation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// Condition operator outside `== != < <= > >=`
    #[error("{entry} ({target}): unsupported condition operator '{operator}'")]
    UnsupportedOperator {
        /// Entry that produced the value
        entry: EntryRef,
        /// Test the entry targets
        target: QualifiedName,
        /// Operator as written
        operator: String,
    },

    /// Component that cannot be used as a keyword argument
    #[error("{entry} ({target}): component '{keyword}' is not a valid keyword")]
    InvalidKeyword {
        /// Entry that produced the value
        entry: EntryRef,
        /// Test the entry targets
        target: QualifiedName,
        /// Rejected keyword
        keyword: String,
    },

    /// Per-variant version mapping that cannot be emitted
    #[error("{entry} ({target}): malformed variant mapping: {message}")]
    MalformedVariantMapping {
        /// Entry that produced the value
        entry: EntryRef,
        /// Test the entry targets
        target: QualifiedName,
        /// What was wrong
        message: String,
    },

    /// Default component that cannot be used as a placeholder keyword
    #[error("component '{component}' is not a valid keyword for placeholder releases")]
    InvalidComponent {
        /// Component name from the manifest
        component: String,
    },

    /// Two released entries for the same test and component
    #[error("'{target}' is released twice for '{component}' ({first} and {second})")]
    DuplicateRelease {
        /// Released test
        target: QualifiedName,
        /// Component released twice
        component: String,
        /// Earlier entry
        first: EntryRef,
        /// Later entry
        second: EntryRef,
    },
}

impl SynthesisError {
    /// Target identifier the error concerns, if any
    #[must_use]
    pub fn target(&self) -> Option<&QualifiedName> {
        match self {
            Self::UnsupportedOperator { target, .. }
            | Self::InvalidKeyword { target, .. }
            | Self::MalformedVariantMapping { target, .. }
            | Self::DuplicateRelease { target, .. } => Some(target),
            Self::InvalidComponent { .. } => None,
        }
    }
}
