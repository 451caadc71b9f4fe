//! stamp Annotation Engine
//!
//! Turns manifest entries into decorator records and merges them onto
//! declarations.
//!
//! # Core Concepts
//!
//! - [`synthesize`]: one [`ManifestEntry`](stamp_manifest::ManifestEntry) → one [`AnnotationRecord`]
//! - [`plan`]: a whole manifest, grouped by target in emission order
//! - [`merge`] / [`merge_declaration`]: replace the manifest-controlled part of
//!   a decorator list, keep the rest where it was
//!
//! # Example
//!
//! ```rust
//! use stamp_annotate::{merge, plan};
//! use stamp_manifest::Manifest;
//! use stamp_syntax::AnnotationList;
//!
//! let yaml = "tracer: golang\nreleased:\n  - name: Test_A\n    version: '1.51.0'\n";
//! let plan = plan(&Manifest::load(yaml.as_bytes()).unwrap()).unwrap();
//! let records = &plan[0];
//! let merged = merge(&AnnotationList::new(), records, "", "\n");
//! assert_eq!(merged.to_source(), "@released(golang=\"1.51.0\")\n");
//! ```

#![warn(unreachable_pub)]

mod error;
mod merge;
mod record;
mod synthesize;

pub use error::SynthesisError;
pub use merge::{is_controlled, merge, merge_declaration, MergePolicy, Merged};
pub use record::{AnnotationRecord, Comparison, RecordArg, RecordValue, CONTEXT};
pub use synthesize::{check_releases, order_records, plan, synthesize, Plan};
