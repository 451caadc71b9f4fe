//! Syntax tree nodes
//!
//! Nodes own the slice of source text they were cut from. Printing a node
//! concatenates that text, so a tree that was never updated prints back
//! exactly what was parsed. Updates go through `with_*` constructors that
//! return new nodes; child vectors are persistent (`im::Vector`), so untouched
//! siblings are shared, not copied.

use crate::expr::{parse_expr, Expr};
use im::Vector;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

/// Position of a declaration: item indices from the module body downwards
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Path to the module root
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th item below this one
    #[inline]
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Item indices, outermost first
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// One `@...` line (possibly spanning several physical lines)
#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    /// Blank and comment lines directly above the decorator
    leading: String,
    /// Exact text from indentation to the end of the line
    text: String,
    /// Dotted callee name (`released`, `coverage.basic`)
    name: String,
    expr: Option<Expr>,
}

impl Decorator {
    pub(crate) fn new(leading: String, text: String, name: String, expr: Option<Expr>) -> Self {
        Self {
            leading,
            text,
            name,
            expr,
        }
    }

    /// Build from the text of one decorator line
    #[must_use]
    pub fn from_source(leading: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let body = text.trim_start().strip_prefix('@').unwrap_or_default();
        let expr = parse_expr(body);
        let name = expr
            .as_ref()
            .and_then(Expr::callee_name)
            .unwrap_or_else(|| leading_dotted_name(body));
        Self {
            leading: leading.into(),
            text,
            name,
            expr,
        }
    }

    /// Build a new decorator rendered from an expression
    #[must_use]
    pub fn synthesized(expr: Expr, indent: &str, newline: &str) -> Self {
        let text = format!("{indent}@{expr}{newline}");
        let name = expr.callee_name().unwrap_or_default();
        Self {
            leading: String::new(),
            text,
            name,
            expr: Some(expr),
        }
    }

    /// Dotted callee name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed expression, if it is within the supported subset
    #[inline]
    #[must_use]
    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    /// Source text of the decorator line(s)
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trivia lines attached above the decorator
    #[inline]
    #[must_use]
    pub fn leading(&self) -> &str {
        &self.leading
    }

    /// Copy with different trivia above it
    #[must_use]
    pub fn with_leading(&self, leading: impl Into<String>) -> Self {
        Self {
            leading: leading.into(),
            ..self.clone()
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.leading);
        out.push_str(&self.text);
    }
}

pub(crate) fn leading_dotted_name(body: &str) -> String {
    body.trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        .collect()
}

/// Ordered decorator list of one declaration
///
/// Covers everything from the first decorator to the declaration header,
/// including blank and comment lines after the last decorator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationList {
    items: Vector<Decorator>,
    trailing: String,
}

impl AnnotationList {
    /// Empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decorators
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no decorators
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in source order (outermost first)
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Decorator> {
        self.items.iter()
    }

    /// Decorator names in order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(Decorator::name).collect()
    }

    /// True if any decorator has the given callee name
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|d| d.name() == name)
    }

    /// Trivia between the last decorator and the header
    #[inline]
    #[must_use]
    pub fn trailing(&self) -> &str {
        &self.trailing
    }

    /// Copy with different trailing trivia
    #[must_use]
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = trailing.into();
        self
    }

    /// Printed form, trivia included
    #[must_use]
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        for decorator in self.items.iter() {
            decorator.write_to(out);
        }
        out.push_str(&self.trailing);
    }
}

impl FromIterator<Decorator> for AnnotationList {
    fn from_iter<I: IntoIterator<Item = Decorator>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            trailing: String::new(),
        }
    }
}

/// Shared part of class and function declarations
#[derive(Debug, Clone, PartialEq)]
pub struct DeclHead {
    decorators: AnnotationList,
    /// `class ...:` / `def ...:` lines up to the end of the colon's line
    header: String,
    indent: String,
    name: String,
    line: usize,
    /// Byte range of the whole declaration in the parsed source
    span: Range<usize>,
}

impl DeclHead {
    pub(crate) fn new(
        decorators: AnnotationList,
        header: String,
        indent: String,
        name: String,
        line: usize,
        span: Range<usize>,
    ) -> Self {
        Self {
            decorators,
            header,
            indent,
            name,
            line,
            span,
        }
    }

    /// Declared identifier
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decorators in source order
    #[inline]
    #[must_use]
    pub fn decorators(&self) -> &AnnotationList {
        &self.decorators
    }

    /// Indentation of the header line
    #[inline]
    #[must_use]
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// 1-based line of the header
    #[inline]
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Byte range of the declaration in the source it was parsed from
    #[inline]
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Line terminator used by the header (`"\n"` when it has none)
    #[must_use]
    pub fn newline(&self) -> &'static str {
        if self.header.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    fn with_decorators(&self, decorators: AnnotationList) -> Self {
        Self {
            decorators,
            ..self.clone()
        }
    }

    fn write_to(&self, out: &mut String) {
        self.decorators.write_to(out);
        out.push_str(&self.header);
    }
}

/// `class` declaration with a parsed body
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    head: DeclHead,
    body: Vector<Item>,
}

impl ClassDecl {
    pub(crate) fn new(head: DeclHead, body: Vector<Item>) -> Self {
        Self { head, body }
    }

    /// Header and decorators
    #[inline]
    #[must_use]
    pub fn head(&self) -> &DeclHead {
        &self.head
    }

    /// Items of the class body
    #[inline]
    #[must_use]
    pub fn body(&self) -> &Vector<Item> {
        &self.body
    }

    /// Copy with the decorators replaced
    #[must_use]
    pub fn with_decorators(&self, decorators: AnnotationList) -> Self {
        Self {
            head: self.head.with_decorators(decorators),
            body: self.body.clone(),
        }
    }

    /// Copy with the body replaced
    #[must_use]
    pub fn with_body(&self, body: Vector<Item>) -> Self {
        Self {
            head: self.head.clone(),
            body,
        }
    }
}

/// `def`/`async def` declaration; the body is kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    head: DeclHead,
    body: String,
}

impl FunctionDecl {
    pub(crate) fn new(head: DeclHead, body: String) -> Self {
        Self { head, body }
    }

    /// Header and decorators
    #[inline]
    #[must_use]
    pub fn head(&self) -> &DeclHead {
        &self.head
    }

    /// Verbatim body text
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Copy with the decorators replaced
    #[must_use]
    pub fn with_decorators(&self, decorators: AnnotationList) -> Self {
        Self {
            head: self.head.with_decorators(decorators),
            body: self.body.clone(),
        }
    }
}

/// Statement-level node
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Source the adapter does not model (statements, comments, blank lines)
    Verbatim(String),
    /// Class declaration
    Class(ClassDecl),
    /// Function declaration
    Function(FunctionDecl),
}

impl Item {
    /// Declaration head, for classes and functions
    #[must_use]
    pub fn head(&self) -> Option<&DeclHead> {
        match self {
            Self::Verbatim(_) => None,
            Self::Class(class) => Some(class.head()),
            Self::Function(function) => Some(function.head()),
        }
    }

    /// Copy with the decorators replaced; `None` for verbatim items
    #[must_use]
    pub fn with_decorators(&self, decorators: AnnotationList) -> Option<Self> {
        match self {
            Self::Verbatim(_) => None,
            Self::Class(class) => Some(Self::Class(class.with_decorators(decorators))),
            Self::Function(function) => Some(Self::Function(function.with_decorators(decorators))),
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Self::Verbatim(text) => out.push_str(text),
            Self::Class(class) => {
                class.head.write_to(out);
                write_items(&class.body, out);
            }
            Self::Function(function) => {
                function.head.write_to(out);
                out.push_str(&function.body);
            }
        }
    }
}

fn write_items(items: &Vector<Item>, out: &mut String) {
    for item in items {
        item.write_to(out);
    }
}

fn replace_at(items: &Vector<Item>, path: &[usize], f: &dyn Fn(&Item) -> Option<Item>) -> Option<Vector<Item>> {
    let (&index, rest) = path.split_first()?;
    let item = items.get(index)?;
    let updated = if rest.is_empty() {
        f(item)?
    } else {
        match item {
            Item::Class(class) => Item::Class(class.with_body(replace_at(class.body(), rest, f)?)),
            _ => return None,
        }
    };
    Some(items.update(index, updated))
}

/// Root node: a whole source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    body: Vector<Item>,
}

impl Module {
    pub(crate) fn new(body: Vector<Item>) -> Self {
        Self { body }
    }

    /// Top-level items
    #[inline]
    #[must_use]
    pub fn body(&self) -> &Vector<Item> {
        &self.body
    }

    /// Copy with the top-level items replaced
    #[must_use]
    pub fn with_body(&self, body: Vector<Item>) -> Self {
        Self { body }
    }

    /// Item at `path`
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&Item> {
        let (&first, rest) = path.indices().split_first()?;
        let mut item = self.body.get(first)?;
        for &index in rest {
            match item {
                Item::Class(class) => item = class.body().get(index)?,
                _ => return None,
            }
        }
        Some(item)
    }

    /// Copy with the declaration at `path` given new decorators
    ///
    /// Returns `None` if `path` does not address a class or function.
    #[must_use]
    pub fn with_decorators_at(&self, path: &NodePath, decorators: AnnotationList) -> Option<Self> {
        let body = replace_at(&self.body, path.indices(), &|item| item.with_decorators(decorators.clone()))?;
        Some(self.with_body(body))
    }

    /// Print the tree back to source text
    #[must_use]
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        write_items(&self.body, &mut out);
        out
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source())
    }
}
