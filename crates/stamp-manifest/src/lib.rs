//! stamp Manifest Model
//!
//! Typed view of a per-test compatibility manifest: which tests are
//! `released` in which component version, and which are `irrelevant`, hit
//! by a `bug` or `missing_feature` under some condition.
//!
//! # Example
//!
//! ```rust
//! use stamp_manifest::{EntryKind, Manifest};
//!
//! let yaml = "tracer: golang\nreleased:\n  - name: Test_A\n    version: '1.51.0'\n";
//! let manifest = Manifest::load(yaml.as_bytes()).unwrap();
//! assert_eq!(manifest.entries()[0].kind, EntryKind::Released);
//! ```

#![warn(unreachable_pub)]

mod error;
mod load;
mod model;

pub use error::SchemaError;
pub use load::Manifest;
pub use model::{
    Condition, ConditionClause, EntryData, EntryKind, EntryRef, ManifestEntry, VersionSpec, WILDCARD_VARIANT,
};
