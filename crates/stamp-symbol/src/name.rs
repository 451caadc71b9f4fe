//! Qualified names for addressing declarations
//!
//! Provides [`QualifiedName`], the dotted nesting path of a declaration
//! (`Test_Blocking.test_path_params`). The module itself is the implicit root
//! and never appears as a segment.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Dotted path of a class or function inside a module
///
/// # Examples
/// - `["Test_Foo"]` → `Test_Foo`
/// - `["Test_Foo", "test_bar"]` → `Test_Foo.test_bar`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct QualifiedName(Vec<String>);

impl QualifiedName {
    /// Create from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Name with a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// The module root (no segments)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Segments, outermost first
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the module root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the name has exactly one segment
    #[inline]
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.0.len() == 1
    }

    /// Innermost segment (the declaration's own identifier)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Enclosing scope (if not root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning a new name
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for QualifiedName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NameError::Empty);
        }

        let segments = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(NameError::EmptySegment(s.to_string()))
                } else if seg.starts_with(|c: char| c.is_ascii_digit())
                    || seg.contains(|c: char| !c.is_alphanumeric() && c != '_')
                {
                    Err(NameError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

/// Errors parsing a dotted name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// Nothing to parse
    #[error("empty name")]
    Empty,

    /// `a..b`
    #[error("name '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Segment that is not an identifier
    #[error("invalid segment: {0} (must be an identifier)")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_parse_and_display() {
        let name: QualifiedName = "Test_Foo.test_bar".parse().unwrap();
        assert_eq!(name.segments(), &["Test_Foo", "test_bar"]);
        assert_eq!(name.to_string(), "Test_Foo.test_bar");
        assert!(!name.is_bare());
        assert_eq!(name.last(), Some("test_bar"));
    }

    #[test]
    fn name_bare() {
        let name: QualifiedName = " test_bar ".parse().unwrap();
        assert!(name.is_bare());
        assert_eq!(name, QualifiedName::single("test_bar"));
    }

    #[test]
    fn name_parent_and_child() {
        let class = QualifiedName::single("Test_Foo");
        let method = class.child("test_bar");
        assert_eq!(method.parent(), Some(class));
        assert_eq!(QualifiedName::root().parent(), None);
        assert!(QualifiedName::root().is_empty());
    }

    #[test]
    fn name_rejects_malformed() {
        assert_eq!("".parse::<QualifiedName>(), Err(NameError::Empty));
        assert!(matches!("a..b".parse::<QualifiedName>(), Err(NameError::EmptySegment(_))));
        assert!(matches!("a.b-c".parse::<QualifiedName>(), Err(NameError::InvalidSegment(_))));
        assert!(matches!("a.1b".parse::<QualifiedName>(), Err(NameError::InvalidSegment(_))));
    }
}
