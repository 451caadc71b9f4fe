//! stamp Rewrite Driver
//!
//! Composes the workspace into one run: load a manifest and a test module,
//! resolve declarations, merge synthesized annotations, print, and commit
//! the result atomically. Nothing is written unless every stage succeeds.
//!
//! # Example
//!
//! ```rust
//! use stamp_rewrite::{rewrite_source, RewriteConfig};
//!
//! let manifest = b"tracer: golang\nreleased:\n  - name: Test_A\n    version: '1.51.0'\n";
//! let source = "class Test_A:\n    pass\n";
//! let result = rewrite_source(manifest, source, &RewriteConfig::default()).unwrap();
//! assert_eq!(result.output, "@released(golang=\"1.51.0\")\nclass Test_A:\n    pass\n");
//! ```

#![warn(unreachable_pub)]

mod commit;
mod config;
mod error;
mod pipeline;
mod report;

pub use commit::write_atomic;
pub use config::RewriteConfig;
pub use error::RewriteError;
pub use pipeline::{rewrite_source, Loaded, Pipeline, Resolved, Rewritten, Serialized};
pub use report::RewriteReport;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where and whether to write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Destination; `None` rewrites the target in place
    pub output: Option<PathBuf>,
    /// Run everything but write nothing
    pub check: bool,
}

impl RewriteOptions {
    /// With output path
    #[inline]
    #[must_use]
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// With check mode
    #[inline]
    #[must_use]
    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }
}

/// Rewrite one file against one manifest
///
/// An in-place rewrite that changes nothing leaves the file untouched.
///
/// # Errors
/// Returns `RewriteError::Io` for unreadable inputs or a failed write, and
/// any pipeline error; in every error case no file is modified.
pub fn rewrite_file(
    manifest: &Path,
    target: &Path,
    options: &RewriteOptions,
    config: &RewriteConfig,
) -> Result<RewriteReport, RewriteError> {
    let manifest_bytes = fs::read(manifest).map_err(RewriteError::io(manifest))?;
    let source = fs::read_to_string(target).map_err(RewriteError::io(target))?;
    let Serialized { output, report } = rewrite_source(&manifest_bytes, &source, config)?;

    if options.check {
        info!(target = %target.display(), changed = report.changed, "check only, nothing written");
        return Ok(report);
    }

    let destination = options.output.as_deref().unwrap_or(target);
    if report.changed || destination != target {
        write_atomic(destination, &output)?;
        info!(path = %destination.display(), "committed");
    } else {
        info!(path = %destination.display(), "unchanged, nothing written");
    }
    Ok(report)
}
