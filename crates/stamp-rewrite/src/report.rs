//! Run summary

use stamp_symbol::QualifiedName;
use std::fmt::{self, Display, Formatter};

/// What a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Test declarations found in the source
    pub declarations: usize,
    /// Declarations whose decorators changed
    pub rewritten: usize,
    /// Placeholder releases inserted
    pub placeholders: usize,
    /// Manifest targets that matched nothing, manifest order
    pub unmatched: Vec<QualifiedName>,
    /// Output text differs from the input
    pub changed: bool,
}

impl Display for RewriteReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} declarations, {} rewritten, {} placeholders, {} unmatched targets",
            self.declarations,
            self.rewritten,
            self.placeholders,
            self.unmatched.len()
        )?;
        if !self.changed {
            f.write_str(" (unchanged)")?;
        }
        Ok(())
    }
}
