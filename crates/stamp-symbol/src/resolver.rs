//! Name resolution
//!
//! Walks a parsed module depth first, keeping a scope of enclosing class
//! names, and records every declaration that follows the test naming
//! convention. Function bodies are never entered.

use crate::error::ResolveError;
use crate::name::QualifiedName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use stamp_syntax::{Item, Module, NodePath};
use tracing::debug;

/// Case-sensitive prefixes that mark test declarations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    /// Prefix of test classes
    pub class_prefix: String,
    /// Prefix of test functions and methods
    pub function_prefix: String,
}

impl NamingConvention {
    /// Create with explicit prefixes
    #[inline]
    #[must_use]
    pub fn new(class_prefix: impl Into<String>, function_prefix: impl Into<String>) -> Self {
        Self {
            class_prefix: class_prefix.into(),
            function_prefix: function_prefix.into(),
        }
    }

    /// Classify an item, `None` if it is not a test declaration
    #[must_use]
    pub fn classify(&self, item: &Item) -> Option<DeclarationKind> {
        match item {
            Item::Class(class) if class.head().name().starts_with(&self.class_prefix) => {
                Some(DeclarationKind::TestClass)
            }
            Item::Function(function) if function.head().name().starts_with(&self.function_prefix) => {
                Some(DeclarationKind::TestFunction)
            }
            _ => None,
        }
    }
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            class_prefix: "Test_".to_string(),
            function_prefix: "test_".to_string(),
        }
    }
}

/// Kind of a recorded declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// Class following the test class convention
    TestClass,
    /// Function or method following the test function convention
    TestFunction,
}

/// Where a recorded declaration lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeclaration {
    /// Item path inside the module
    pub path: NodePath,
    /// Class or function
    pub kind: DeclarationKind,
    /// 1-based header line
    pub line: usize,
}

/// Lookup table from qualified name to declaration, in source order
#[derive(Debug, Clone, Default)]
pub struct DeclarationIndex {
    entries: IndexMap<QualifiedName, ResolvedDeclaration>,
    by_leaf: IndexMap<String, Vec<QualifiedName>>,
}

impl DeclarationIndex {
    /// Number of recorded declarations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup
    #[inline]
    #[must_use]
    pub fn get(&self, name: &QualifiedName) -> Option<&ResolvedDeclaration> {
        self.entries.get(name)
    }

    /// All declarations in source order
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&QualifiedName, &ResolvedDeclaration)> {
        self.entries.iter()
    }

    /// Declarations a manifest target refers to
    ///
    /// A dotted target matches its exact qualified name only. A bare target
    /// matches every declaration whose own identifier equals it, at any depth.
    #[must_use]
    pub fn lookup(&self, target: &QualifiedName) -> Vec<(&QualifiedName, &ResolvedDeclaration)> {
        if !target.is_bare() {
            return self.entries.get_key_value(target).into_iter().collect();
        }
        let Some(leaf) = target.last() else {
            return Vec::new();
        };
        self.by_leaf
            .get(leaf)
            .into_iter()
            .flatten()
            .filter_map(|name| self.entries.get_key_value(name))
            .collect()
    }

    fn insert(&mut self, name: QualifiedName, declaration: ResolvedDeclaration) -> Result<(), ResolveError> {
        if let Some(existing) = self.entries.get(&name) {
            return Err(ResolveError::DuplicateDeclaration {
                name,
                first_line: existing.line,
                line: declaration.line,
            });
        }
        if let Some(leaf) = name.last() {
            self.by_leaf.entry(leaf.to_string()).or_default().push(name.clone());
        }
        self.entries.insert(name, declaration);
        Ok(())
    }
}

/// Build the lookup table for a module
///
/// # Errors
/// Returns `ResolveError::DuplicateDeclaration` if two recorded declarations
/// share a qualified name.
pub fn resolve(module: &Module, naming: &NamingConvention) -> Result<DeclarationIndex, ResolveError> {
    let mut index = DeclarationIndex::default();
    walk(module.body(), &QualifiedName::root(), &NodePath::root(), naming, &mut index)?;
    debug!(declarations = index.len(), "resolved test declarations");
    Ok(index)
}

fn walk(
    items: &im::Vector<Item>,
    scope: &QualifiedName,
    path: &NodePath,
    naming: &NamingConvention,
    index: &mut DeclarationIndex,
) -> Result<(), ResolveError> {
    for (position, item) in items.iter().enumerate() {
        let Some(head) = item.head() else {
            continue;
        };
        let name = scope.child(head.name());
        let item_path = path.child(position);

        if let Some(kind) = naming.classify(item) {
            index.insert(
                name.clone(),
                ResolvedDeclaration {
                    path: item_path.clone(),
                    kind,
                    line: head.line(),
                },
            )?;
        }

        if let Item::Class(class) = item {
            walk(class.body(), &name, &item_path, naming, index)?;
        }
    }
    Ok(())
}
