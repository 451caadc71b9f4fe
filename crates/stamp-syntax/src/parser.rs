//! Tree builder over a tree-sitter parse
//!
//! tree-sitter supplies structure and byte ranges; the builder cuts the source
//! into line-aligned segments along them. Every byte lands in exactly one
//! node, so the unmodified tree prints back the input.
//!
//! Only definitions that are direct statements of the module or of a class
//! body become declarations. A `def` under `if`, `try` or `with` stays
//! verbatim, as does every function body.

use crate::error::ParseError;
use crate::expr::{from_node, named_operands, Expr};
use crate::tree::{leading_dotted_name, AnnotationList, ClassDecl, DeclHead, Decorator, FunctionDecl, Item, Module};
use im::Vector;
use std::ops::Range;
use tree_sitter::{Node, Parser};

/// Parser loaded with the Python grammar
pub(crate) fn python_parser() -> Result<Parser, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseError::ParserInit(e.to_string()))?;
    Ok(parser)
}

/// Offset of the start of the line containing `offset`
fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset just past the newline ending the line on which `offset` falls
fn line_end(source: &str, offset: usize) -> usize {
    if offset == 0 || source[..offset].ends_with('\n') {
        return offset;
    }
    source[offset..].find('\n').map_or(source.len(), |i| offset + i + 1)
}

/// The class or function a statement declares, if it declares one
fn definition_of(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "class_definition" | "function_definition" => Some(node),
        "decorated_definition" => node
            .child_by_field_name("definition")
            .filter(|definition| matches!(definition.kind(), "class_definition" | "function_definition")),
        _ => None,
    }
}

/// End of the header: the line holding the `:` that opens the body
fn header_end(source: &str, definition: Node<'_>) -> usize {
    let body_start = definition
        .child_by_field_name("body")
        .map_or(definition.end_byte(), |body| body.start_byte());
    let mut cursor = definition.walk();
    let colon = definition
        .children(&mut cursor)
        .filter(|child| child.kind() == ":" && child.end_byte() <= body_start)
        .last();
    line_end(source, colon.map_or(definition.end_byte(), |colon| colon.end_byte()))
}

fn callee_text(node: Node<'_>, source: &str) -> String {
    let callee = match node.kind() {
        "call" => node.child_by_field_name("function").unwrap_or(node),
        _ => node,
    };
    source.get(callee.byte_range()).map(leading_dotted_name).unwrap_or_default()
}

struct TreeBuilder<'s> {
    source: &'s str,
}

impl TreeBuilder<'_> {
    fn text(&self, range: Range<usize>) -> String {
        self.source[range].to_string()
    }

    /// Cut `region` into items, one declaration per defining statement
    fn items(&self, statements: Node<'_>, region: Range<usize>) -> Vector<Item> {
        let mut items = Vector::new();
        let mut pos = region.start;

        let mut cursor = statements.walk();
        for statement in statements.named_children(&mut cursor) {
            let Some(definition) = definition_of(statement) else {
                continue;
            };
            let start = line_start(self.source, statement.start_byte());
            let end = line_end(self.source, statement.end_byte()).min(region.end);
            if start < pos || end <= start {
                continue;
            }
            if start > pos {
                items.push_back(Item::Verbatim(self.text(pos..start)));
            }
            items.push_back(self.declaration(statement, definition, start..end));
            pos = end;
        }

        if pos < region.end {
            items.push_back(Item::Verbatim(self.text(pos..region.end)));
        }
        items
    }

    fn declaration(&self, statement: Node<'_>, definition: Node<'_>, segment: Range<usize>) -> Item {
        let mut pos = segment.start;
        let mut decorators = Vec::new();
        if statement.kind() == "decorated_definition" {
            for decorator in named_operands(statement).into_iter().filter(|child| child.kind() == "decorator") {
                let start = line_start(self.source, decorator.start_byte()).max(pos);
                let end = line_end(self.source, decorator.end_byte()).max(start);
                decorators.push(self.decorator(decorator, pos..start, start..end));
                pos = end;
            }
        }

        let indent_start = line_start(self.source, definition.start_byte());
        let header_start = indent_start.max(pos);
        let header_end = header_end(self.source, definition).clamp(header_start, segment.end);
        let indent: String = self.source[indent_start..definition.start_byte()]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let name = definition
            .child_by_field_name("name")
            .and_then(|name| self.source.get(name.byte_range()))
            .unwrap_or_default()
            .to_string();

        let head = DeclHead::new(
            decorators
                .into_iter()
                .collect::<AnnotationList>()
                .with_trailing(self.text(pos..header_start)),
            self.text(header_start..header_end),
            indent,
            name,
            definition.start_position().row + 1,
            segment.clone(),
        );

        let body = header_end..segment.end;
        match (definition.kind(), definition.child_by_field_name("body")) {
            ("class_definition", Some(block)) => Item::Class(ClassDecl::new(head, self.items(block, body))),
            ("class_definition", None) => {
                let rest = if body.is_empty() {
                    Vector::new()
                } else {
                    Vector::unit(Item::Verbatim(self.text(body)))
                };
                Item::Class(ClassDecl::new(head, rest))
            }
            _ => Item::Function(FunctionDecl::new(head, self.text(body))),
        }
    }

    fn decorator(&self, node: Node<'_>, leading: Range<usize>, line: Range<usize>) -> Decorator {
        let expression = named_operands(node).into_iter().next();
        let expr = expression.and_then(|expression| from_node(expression, self.source));
        let name = expr
            .as_ref()
            .and_then(Expr::callee_name)
            .or_else(|| expression.map(|expression| callee_text(expression, self.source)))
            .unwrap_or_default();
        Decorator::new(self.text(leading), self.text(line), name, expr)
    }
}

/// First `ERROR` or `MISSING` node, depth first
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(first_error);
    found
}

fn syntax_error(root: Node<'_>, source: &str) -> ParseError {
    let Some(node) = first_error(root) else {
        return ParseError::Unexpected {
            line: 1,
            text: String::new(),
        };
    };
    let line = node.start_position().row + 1;
    if node.is_missing() {
        return ParseError::Missing {
            line,
            expected: node.kind().to_string(),
        };
    }
    let text = source
        .get(node.byte_range())
        .and_then(|text| text.lines().map(str::trim).find(|line| !line.is_empty()))
        .unwrap_or(node.kind());
    ParseError::Unexpected {
        line,
        text: text.chars().take(40).collect(),
    }
}

/// Parse source text into a [`Module`]
///
/// # Errors
/// Returns `ParseError` for source the Python grammar rejects: unbalanced
/// brackets, unterminated strings, decorators without a declaration.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let mut parser = python_parser()?;
    let tree = parser.parse(source, None).ok_or(ParseError::ParseFailed)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(syntax_error(root, source));
    }
    let builder = TreeBuilder { source };
    Ok(Module::new(builder.items(root, 0..source.len())))
}
