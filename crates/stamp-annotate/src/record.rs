//! Annotation records
//!
//! [`AnnotationRecord`] is the intermediate form between manifest entries and
//! tree nodes: a decorator name plus ordered arguments. Records know how to
//! render themselves as expressions but nothing about where they go.

use indexmap::IndexMap;
use stamp_manifest::{EntryKind, EntryRef};
use stamp_syntax::{Arg, BoolOp, CompOp, Decorator, Expr};
use std::fmt::{self, Display, Formatter};

/// Name of the object whose attributes conditions compare
pub const CONTEXT: &str = "context";

/// `context.<attribute> <op> "<literal>"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Context attribute compared
    pub attribute: String,
    /// Comparison operator
    pub op: CompOp,
    /// Right-hand string literal, unquoted
    pub literal: String,
}

impl Comparison {
    fn to_expr(&self) -> Expr {
        Expr::compare(
            Expr::attribute(Expr::name(CONTEXT), &self.attribute),
            self.op,
            Expr::string(&self.literal),
        )
    }
}

/// Argument value shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    /// String literal
    Str(String),
    /// Dict literal of string keys and values, authored order
    Mapping(IndexMap<String, String>),
    /// One comparison, or several joined with `and`
    Condition(Vec<Comparison>),
}

impl RecordValue {
    fn to_expr(&self) -> Expr {
        match self {
            Self::Str(value) => Expr::string(value),
            Self::Mapping(pairs) => Expr::Dict(
                pairs
                    .iter()
                    .map(|(key, value)| (Expr::string(key), Expr::string(value)))
                    .collect(),
            ),
            Self::Condition(comparisons) => match comparisons.as_slice() {
                [single] => single.to_expr(),
                many => Expr::BoolOp {
                    op: BoolOp::And,
                    values: many.iter().map(Comparison::to_expr).collect(),
                },
            },
        }
    }
}

/// Positional or keyword argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordArg {
    /// `None` for positional arguments
    pub keyword: Option<String>,
    /// Argument value
    pub value: RecordValue,
}

impl RecordArg {
    /// Positional argument
    #[inline]
    #[must_use]
    pub fn positional(value: RecordValue) -> Self {
        Self { keyword: None, value }
    }

    /// `keyword=value`
    #[inline]
    #[must_use]
    pub fn keyword(keyword: impl Into<String>, value: RecordValue) -> Self {
        Self {
            keyword: Some(keyword.into()),
            value,
        }
    }

    fn to_arg(&self) -> Arg {
        let value = self.value.to_expr();
        match &self.keyword {
            Some(name) => Arg::Keyword {
                name: name.clone(),
                value,
            },
            None => Arg::Positional(value),
        }
    }
}

/// One synthesized annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    kind: EntryKind,
    component: String,
    args: Vec<RecordArg>,
    /// Entry the record was synthesized from; `None` for placeholders
    origin: Option<EntryRef>,
}

impl AnnotationRecord {
    /// Create a record
    #[must_use]
    pub fn new(kind: EntryKind, component: impl Into<String>, args: Vec<RecordArg>, origin: Option<EntryRef>) -> Self {
        Self {
            kind,
            component: component.into(),
            args,
            origin,
        }
    }

    /// `released(<component>="<version>")` not backed by any entry
    #[must_use]
    pub fn placeholder_release(component: &str, version: &str) -> Self {
        Self::new(
            EntryKind::Released,
            component,
            vec![RecordArg::keyword(component, RecordValue::Str(version.to_string()))],
            None,
        )
    }

    /// Manifest kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Decorator function name
    #[inline]
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        self.kind.decorator_name()
    }

    /// Component the record concerns
    #[inline]
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Arguments in emission order
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[RecordArg] {
        &self.args
    }

    /// Source entry
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<EntryRef> {
        self.origin
    }

    /// Call expression for the decorator
    #[must_use]
    pub fn to_expr(&self) -> Expr {
        Expr::call(
            Expr::name(self.function_name()),
            self.args.iter().map(RecordArg::to_arg).collect(),
        )
    }

    /// Decorator node laid out for a declaration
    #[must_use]
    pub fn render(&self, indent: &str, newline: &str) -> Decorator {
        Decorator::synthesized(self.to_expr(), indent, newline)
    }
}

impl Display for AnnotationRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.to_expr())
    }
}
