//! Atomic file output
//!
//! The new contents go to a temporary file in the destination directory,
//! which is then renamed over the destination. Readers see either the old
//! file or the new one, never a truncated mix.

use crate::error::RewriteError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `contents`
///
/// Permissions of an existing destination are carried over.
///
/// # Errors
/// Returns `RewriteError::Io` if the temporary file cannot be created,
/// written or renamed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), RewriteError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(RewriteError::io(dir))?;
    file.write_all(contents.as_bytes()).map_err(RewriteError::io(file.path()))?;
    file.as_file().sync_all().map_err(RewriteError::io(file.path()))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(file.path(), metadata.permissions()).map_err(RewriteError::io(file.path()))?;
    }

    file.persist(path)
        .map_err(|err| RewriteError::io(path)(err.error))?;
    Ok(())
}
