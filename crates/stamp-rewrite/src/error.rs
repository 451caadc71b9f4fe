//! Error types for the rewrite driver

use stamp_annotate::SynthesisError;
use stamp_manifest::SchemaError;
use stamp_symbol::{QualifiedName, ResolveError};
use stamp_syntax::ParseError;
use std::path::PathBuf;

/// Any reason a run stops before writing
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// Malformed manifest
    #[error("invalid manifest: {0}")]
    Schema(#[from] SchemaError),

    /// Malformed source
    #[error("cannot parse source: {0}")]
    Parse(#[from] ParseError),

    /// Ambiguous qualified name
    #[error("cannot resolve declarations: {0}")]
    Resolve(#[from] ResolveError),

    /// Manifest value that cannot be encoded
    #[error("cannot synthesize annotations: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Strict mode: targets that match no declaration
    #[error("manifest targets match no declaration: {}", join(.0))]
    UnmatchedTargets(Vec<QualifiedName>),

    /// Configuration file that is not valid TOML of the expected shape
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Reading or writing a file failed
    #[error("{}: {source}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl RewriteError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

fn join(names: &[QualifiedName]) -> String {
    names.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
