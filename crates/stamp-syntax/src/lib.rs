//! stamp Syntax Adapter
//!
//! A minimal, round-trip preserving tree for the parts of a Python test
//! module that annotations attach to: classes, functions and their decorator
//! lists. Everything else is carried as verbatim text. Structure comes from
//! tree-sitter with the Python grammar; text comes from the source itself.
//!
//! # Round-trip law
//!
//! For any well-formed `source`, `parse_module(source)?.to_source() == source`.
//! Updates are functional: [`Module::with_decorators_at`] returns a new tree
//! that shares every untouched subtree with the original.
//!
//! # Example
//!
//! ```rust
//! use stamp_syntax::parse_module;
//!
//! let source = "@coverage.basic\nclass Test_A:\n    pass\n";
//! let module = parse_module(source).unwrap();
//! assert_eq!(module.to_source(), source);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod expr;
mod parser;
pub mod tree;

pub use error::ParseError;
pub use expr::{parse_expr, Arg, BoolOp, CompOp, Expr, StringLiteral};
pub use parser::parse_module;
pub use tree::{AnnotationList, ClassDecl, DeclHead, Decorator, FunctionDecl, Item, Module, NodePath};
