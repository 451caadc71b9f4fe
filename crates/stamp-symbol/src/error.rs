//! Error types for name resolution

use crate::name::QualifiedName;

/// Errors while building the declaration index
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Two test declarations share a qualified name
    #[error("duplicate declaration '{name}' at line {line} (first declared at line {first_line})")]
    DuplicateDeclaration {
        /// Name shared by both declarations
        name: QualifiedName,
        /// 1-based line of the first declaration
        first_line: usize,
        /// 1-based line of the repeated declaration
        line: usize,
    },
}
