//! Error types for the syntax adapter

/// Errors raised while parsing a source file
///
/// Every variant is fatal for the run: a file that fails to parse is never
/// partially rewritten.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The Python grammar could not be loaded into the parser
    #[error("cannot load the Python grammar: {0}")]
    ParserInit(String),

    /// The parser gave up without producing a tree
    #[error("parsing failed")]
    ParseFailed,

    /// Source the grammar cannot place (an `ERROR` node)
    #[error("line {line}: unexpected '{text}'")]
    Unexpected {
        /// 1-based line of the first offending token
        line: usize,
        /// First line of the offending text
        text: String,
    },

    /// A token the grammar requires is absent (a `MISSING` node)
    #[error("line {line}: expected '{expected}'")]
    Missing {
        /// 1-based line where the token was expected
        line: usize,
        /// Kind of the missing token
        expected: String,
    },
}

impl ParseError {
    /// 1-based line where the problem was detected
    #[inline]
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Unexpected { line, .. } | Self::Missing { line, .. } => Some(*line),
            Self::ParserInit(_) | Self::ParseFailed => None,
        }
    }
}
