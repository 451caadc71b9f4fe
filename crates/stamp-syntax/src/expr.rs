//! Expression subset used in decorators
//!
//! Covers what test annotations are written with: names, attribute access,
//! calls, string and number literals, dict/list/tuple displays, comparisons
//! and boolean operators. Expressions are read off tree-sitter nodes; anything
//! else is left unparsed by the caller.

use crate::parser::python_parser;
use std::fmt::{self, Display, Formatter, Write as _};
use tree_sitter::Node;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtE,
    /// `>`
    Gt,
    /// `>=`
    GtE,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `is`
    Is,
    /// `is not`
    IsNot,
}

impl CompOp {
    /// Source spelling
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
        }
    }

    /// Parse the source spelling (inner whitespace is normalised)
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let normalized: Vec<&str> = symbol.split_whitespace().collect();
        match normalized.as_slice() {
            ["=="] => Some(Self::Eq),
            ["!="] => Some(Self::NotEq),
            ["<"] => Some(Self::Lt),
            ["<="] => Some(Self::LtE),
            [">"] => Some(Self::Gt),
            [">="] => Some(Self::GtE),
            ["in"] => Some(Self::In),
            ["not", "in"] => Some(Self::NotIn),
            ["is"] => Some(Self::Is),
            ["is", "not"] => Some(Self::IsNot),
            _ => None,
        }
    }
}

impl Display for CompOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    /// `and`
    And,
    /// `or`
    Or,
}

impl BoolOp {
    fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// A string literal, kept in its source form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringLiteral {
    raw: String,
}

impl StringLiteral {
    /// Wrap source text that is already a quoted literal
    #[inline]
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Build a double-quoted literal for `value`
    #[must_use]
    pub fn quoted(value: &str) -> Self {
        let mut raw = String::with_capacity(value.len() + 2);
        raw.push('"');
        for c in value.chars() {
            match c {
                '"' => raw.push_str("\\\""),
                '\\' => raw.push_str("\\\\"),
                '\n' => raw.push_str("\\n"),
                '\r' => raw.push_str("\\r"),
                '\t' => raw.push_str("\\t"),
                c => raw.push(c),
            }
        }
        raw.push('"');
        Self { raw }
    }

    /// Source text including prefix and quotes
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded value for plain (unprefixed or `r`/`u`) literals
    ///
    /// Returns `None` for byte strings, f-strings and unknown escapes.
    #[must_use]
    pub fn value(&self) -> Option<String> {
        let quote_at = self.raw.find(['"', '\''])?;
        let prefix = self.raw[..quote_at].to_ascii_lowercase();
        let raw_mode = match prefix.as_str() {
            "" | "u" => false,
            "r" => true,
            _ => return None,
        };
        let body = &self.raw[quote_at..];
        let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") { 3 } else { 1 };
        if body.len() < quote_len * 2 {
            return None;
        }
        let inner = &body[quote_len..body.len() - quote_len];
        if raw_mode {
            return Some(inner.to_string());
        }

        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next()? {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '\n' => {}
                c @ ('\\' | '"' | '\'') => out.push(c),
                _ => return None,
            }
        }
        Some(out)
    }
}

impl Display for StringLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One call argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `value`
    Positional(Expr),
    /// `name=value`
    Keyword {
        /// Parameter name
        name: String,
        /// Argument value
        value: Expr,
    },
    /// `*value`
    Star(Expr),
    /// `**value`
    DoubleStar(Expr),
}

impl Arg {
    /// Keyword name, if this is a keyword argument
    #[inline]
    #[must_use]
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Self::Keyword { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Argument value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Expr {
        match self {
            Self::Positional(value)
            | Self::Keyword { value, .. }
            | Self::Star(value)
            | Self::DoubleStar(value) => value,
        }
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(value) => write!(f, "{value}"),
            Self::Keyword { name, value } => write!(f, "{name}={value}"),
            Self::Star(value) => write!(f, "*{value}"),
            Self::DoubleStar(value) => write!(f, "**{value}"),
        }
    }
}

/// Decorator expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier, including `True`/`False`/`None`
    Name(String),
    /// `value.attr`
    Attribute {
        /// Object being accessed
        value: Box<Expr>,
        /// Attribute name
        attr: String,
    },
    /// `func(args...)`
    Call {
        /// Callee
        func: Box<Expr>,
        /// Arguments in source order
        args: Vec<Arg>,
    },
    /// String literal in source form
    Str(StringLiteral),
    /// Integer or float literal as written
    Number(String),
    /// `{key: value, ...}`
    Dict(Vec<(Expr, Expr)>),
    /// `[a, b]`
    List(Vec<Expr>),
    /// `(a, b)`
    Tuple(Vec<Expr>),
    /// `left op right [op right ...]`
    Compare {
        /// First operand
        left: Box<Expr>,
        /// Operator and right operand pairs
        comparisons: Vec<(CompOp, Expr)>,
    },
    /// Operands joined by one boolean operator
    BoolOp {
        /// Operator
        op: BoolOp,
        /// Two or more operands
        values: Vec<Expr>,
    },
    /// `not operand`
    Not(Box<Expr>),
}

impl Expr {
    /// `name`
    #[inline]
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// `value.attr`
    #[inline]
    #[must_use]
    pub fn attribute(value: Expr, attr: impl Into<String>) -> Self {
        Self::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    /// `func(args...)`
    #[inline]
    #[must_use]
    pub fn call(func: Expr, args: Vec<Arg>) -> Self {
        Self::Call {
            func: Box::new(func),
            args,
        }
    }

    /// Double-quoted string literal
    #[inline]
    #[must_use]
    pub fn string(value: &str) -> Self {
        Self::Str(StringLiteral::quoted(value))
    }

    /// `left op right`
    #[inline]
    #[must_use]
    pub fn compare(left: Expr, op: CompOp, right: Expr) -> Self {
        Self::Compare {
            left: Box::new(left),
            comparisons: vec![(op, right)],
        }
    }

    /// Dotted form of a `Name`/`Attribute` chain (`coverage.basic`)
    #[must_use]
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name.clone()),
            Self::Attribute { value, attr } => Some(format!("{}.{attr}", value.dotted_name()?)),
            _ => None,
        }
    }

    /// Dotted name of the called function, or of the expression itself
    #[must_use]
    pub fn callee_name(&self) -> Option<String> {
        match self {
            Self::Call { func, .. } => func.dotted_name(),
            other => other.dotted_name(),
        }
    }

    /// Call arguments (empty for non-calls)
    #[must_use]
    pub fn call_args(&self) -> &[Arg] {
        match self {
            Self::Call { args, .. } => args,
            _ => &[],
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::BoolOp { op: BoolOp::Or, .. } => 1,
            Self::BoolOp { op: BoolOp::And, .. } => 2,
            Self::Not(_) => 3,
            Self::Compare { .. } => 4,
            _ => 5,
        }
    }

    fn fmt_operand(&self, f: &mut Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn join<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Attribute { value, attr } => {
                value.fmt_operand(f, 5)?;
                write!(f, ".{attr}")
            }
            Self::Call { func, args } => {
                func.fmt_operand(f, 5)?;
                f.write_char('(')?;
                join(f, args)?;
                f.write_char(')')
            }
            Self::Str(literal) => write!(f, "{literal}"),
            Self::Number(number) => f.write_str(number),
            Self::Dict(entries) => {
                f.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_char('}')
            }
            Self::List(items) => {
                f.write_char('[')?;
                join(f, items)?;
                f.write_char(']')
            }
            Self::Tuple(items) => {
                f.write_char('(')?;
                join(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::Compare { left, comparisons } => {
                left.fmt_operand(f, 5)?;
                for (op, right) in comparisons {
                    write!(f, " {op} ")?;
                    right.fmt_operand(f, 5)?;
                }
                Ok(())
            }
            Self::BoolOp { op, values } => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.as_str())?;
                    }
                    value.fmt_operand(f, self.precedence() + 1)?;
                }
                Ok(())
            }
            Self::Not(operand) => {
                f.write_str("not ")?;
                operand.fmt_operand(f, 3)
            }
        }
    }
}


// ============================================================================
// Conversion from tree-sitter nodes
// ============================================================================

/// Named children that are not comments
pub(crate) fn named_operands(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn node_text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    source.get(node.byte_range())
}

/// Convert a tree-sitter expression node
///
/// Returns `None` for anything outside the supported subset.
pub(crate) fn from_node(node: Node<'_>, source: &str) -> Option<Expr> {
    match node.kind() {
        "identifier" | "true" | "false" | "none" => Some(Expr::Name(node_text(node, source)?.to_string())),
        "integer" | "float" => Some(Expr::Number(node_text(node, source)?.to_string())),
        "string" => Some(Expr::Str(StringLiteral::from_raw(node_text(node, source)?))),
        "attribute" => {
            let value = from_node(node.child_by_field_name("object")?, source)?;
            let attr = node_text(node.child_by_field_name("attribute")?, source)?;
            Some(Expr::attribute(value, attr))
        }
        "call" => {
            let func = from_node(node.child_by_field_name("function")?, source)?;
            let arguments = node.child_by_field_name("arguments")?;
            if arguments.kind() != "argument_list" {
                return None;
            }
            let args = named_operands(arguments)
                .into_iter()
                .map(|argument| call_argument(argument, source))
                .collect::<Option<Vec<_>>>()?;
            Some(Expr::call(func, args))
        }
        "parenthesized_expression" => match named_operands(node).as_slice() {
            [inner] => from_node(*inner, source),
            _ => None,
        },
        "tuple" => elements(node, source).map(Expr::Tuple),
        "list" => elements(node, source).map(Expr::List),
        "dictionary" => named_operands(node)
            .into_iter()
            .map(|pair| {
                if pair.kind() != "pair" {
                    return None;
                }
                let key = from_node(pair.child_by_field_name("key")?, source)?;
                let value = from_node(pair.child_by_field_name("value")?, source)?;
                Some((key, value))
            })
            .collect::<Option<Vec<_>>>()
            .map(Expr::Dict),
        "comparison_operator" => comparison(node, source),
        "boolean_operator" => boolean(node, source),
        "not_operator" => {
            let operand = from_node(node.child_by_field_name("argument")?, source)?;
            Some(Expr::Not(Box::new(operand)))
        }
        _ => None,
    }
}

fn elements(node: Node<'_>, source: &str) -> Option<Vec<Expr>> {
    named_operands(node)
        .into_iter()
        .map(|element| from_node(element, source))
        .collect()
}

fn call_argument<'t>(node: Node<'t>, source: &str) -> Option<Arg> {
    let single = |node: Node<'t>| named_operands(node).into_iter().next();
    match node.kind() {
        "keyword_argument" => Some(Arg::Keyword {
            name: node_text(node.child_by_field_name("name")?, source)?.to_string(),
            value: from_node(node.child_by_field_name("value")?, source)?,
        }),
        "list_splat" => Some(Arg::Star(from_node(single(node)?, source)?)),
        "dictionary_splat" => Some(Arg::DoubleStar(from_node(single(node)?, source)?)),
        _ => from_node(node, source).map(Arg::Positional),
    }
}

/// `a < b == c`: operands are named children, operators the anonymous ones
fn comparison(node: Node<'_>, source: &str) -> Option<Expr> {
    let mut left = None;
    let mut comparisons = Vec::new();
    let mut pending = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_extra() {
            continue;
        }
        if child.is_named() {
            let operand = from_node(child, source)?;
            match pending.take() {
                Some(op) => comparisons.push((op, operand)),
                None if left.is_none() => left = Some(operand),
                None => return None,
            }
        } else {
            let symbol = node_text(child, source)?;
            pending = Some(CompOp::from_symbol(symbol).or_else(|| CompOp::from_symbol(child.kind()))?);
        }
    }

    if pending.is_some() || comparisons.is_empty() {
        return None;
    }
    Some(Expr::Compare {
        left: Box::new(left?),
        comparisons,
    })
}

/// `a and b and c` nests to the left; same-operator chains are flattened
fn boolean(node: Node<'_>, source: &str) -> Option<Expr> {
    let op = match node_text(node.child_by_field_name("operator")?, source)? {
        "and" => BoolOp::And,
        "or" => BoolOp::Or,
        _ => return None,
    };
    let mut values = Vec::new();
    for field in ["left", "right"] {
        let side = node.child_by_field_name(field)?;
        match from_node(side, source)? {
            Expr::BoolOp { op: inner, values: nested } if inner == op && side.kind() == "boolean_operator" => {
                values.extend(nested);
            }
            other => values.push(other),
        }
    }
    Some(Expr::BoolOp { op, values })
}

/// Parse an expression from source text
///
/// Returns `None` when the text is not a single expression in the supported
/// subset.
#[must_use]
pub fn parse_expr(text: &str) -> Option<Expr> {
    // brackets let the expression span lines and end in a comment
    let wrapped = format!("({text}\n)");
    let mut parser = python_parser().ok()?;
    let tree = parser.parse(&wrapped, None)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }
    let statements = named_operands(root);
    let [statement] = statements.as_slice() else {
        return None;
    };
    if statement.kind() != "expression_statement" {
        return None;
    }
    match named_operands(*statement).as_slice() {
        [expression] => from_node(*expression, &wrapped),
        _ => None,
    }
}
