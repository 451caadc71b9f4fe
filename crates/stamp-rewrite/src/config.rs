//! Run configuration
//!
//! Passed explicitly into the driver. Every field has a default, so a TOML
//! file only needs the keys it changes:
//!
//! ```toml
//! strict = true
//!
//! [naming]
//! class_prefix = "Test_"
//!
//! [merge]
//! default_release = false
//! ```

use crate::error::RewriteError;
use serde::{Deserialize, Serialize};
use stamp_annotate::MergePolicy;
use stamp_symbol::NamingConvention;
use std::fs;
use std::path::Path;

/// Rewrite driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Test naming convention
    pub naming: NamingConvention,
    /// Placeholder policy
    pub merge: MergePolicy,
    /// Fail when a manifest target matches nothing
    pub strict: bool,
}

impl RewriteConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With naming convention
    #[inline]
    #[must_use]
    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    /// With merge policy
    #[inline]
    #[must_use]
    pub fn with_merge_policy(mut self, merge: MergePolicy) -> Self {
        self.merge = merge;
        self
    }

    /// With placeholder insertion on or off
    #[inline]
    #[must_use]
    pub fn with_default_release(mut self, enabled: bool) -> Self {
        self.merge.default_release = enabled;
        self
    }

    /// With strict target matching
    #[inline]
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns `RewriteError::Config` for invalid TOML or mistyped keys.
    pub fn from_toml(text: &str) -> Result<Self, RewriteError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns `RewriteError::Io` if the file cannot be read, otherwise as
    /// [`RewriteConfig::from_toml`].
    pub fn load(path: &Path) -> Result<Self, RewriteError> {
        let text = fs::read_to_string(path).map_err(RewriteError::io(path))?;
        Self::from_toml(&text)
    }
}
