//! stamp Symbol Resolution
//!
//! Maps manifest targets onto declarations of a parsed test module.
//!
//! # Core Concepts
//!
//! - [`QualifiedName`]: dotted nesting path (`Test_Foo.test_bar`)
//! - [`NamingConvention`]: prefixes that mark test classes and functions
//! - [`DeclarationIndex`]: qualified name → [`ResolvedDeclaration`], built by [`resolve`]

#![warn(unreachable_pub)]

mod error;
mod name;
mod resolver;

pub use error::ResolveError;
pub use name::{NameError, QualifiedName};
pub use resolver::{resolve, DeclarationIndex, DeclarationKind, NamingConvention, ResolvedDeclaration};
