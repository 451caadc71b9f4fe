//! Decorator list merging
//!
//! Existing decorators are split into manifest-controlled ones (`released`,
//! `irrelevant`, `bug`, `missing_feature`) and everything else. When a
//! declaration has records, every controlled decorator is dropped and the
//! records take their place:
//!
//! - released records where the first `released` was (top if none)
//! - other records where the first other controlled decorator was, or
//!   directly above the declaration if there was none
//!
//! Positions are counted in preserved decorators, so a second merge with the
//! same records puts everything back where the first one did. Comment and
//! blank lines above a dropped decorator move onto the next decorator written
//! after it, or below the list when nothing follows.

use crate::error::SynthesisError;
use crate::record::AnnotationRecord;
use crate::synthesize::is_identifier;
use serde::{Deserialize, Serialize};
use stamp_manifest::EntryKind;
use stamp_syntax::{AnnotationList, DeclHead, Decorator};
use stamp_symbol::DeclarationKind;
use std::iter;

/// Placeholder handling for test classes without a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    /// Insert `@released(<component>="<unknown_version>")` on test classes
    /// whose final list has no `released`
    pub default_release: bool,
    /// Version marker used by the placeholder
    pub unknown_version: String,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            default_release: true,
            unknown_version: "?".to_string(),
        }
    }
}

impl MergePolicy {
    /// Placeholder record for `component`, `None` when disabled
    ///
    /// # Errors
    /// Returns `SynthesisError::InvalidComponent` if the component cannot be
    /// a keyword argument.
    pub fn placeholder(&self, component: &str) -> Result<Option<AnnotationRecord>, SynthesisError> {
        if !self.default_release {
            return Ok(None);
        }
        if !is_identifier(component) {
            return Err(SynthesisError::InvalidComponent {
                component: component.to_string(),
            });
        }
        Ok(Some(AnnotationRecord::placeholder_release(component, &self.unknown_version)))
    }
}

/// True for decorators the manifest owns
#[inline]
#[must_use]
pub fn is_controlled(decorator: &Decorator) -> bool {
    EntryKind::from_decorator_name(decorator.name()).is_some()
}

/// Combine an existing list with synthesized records
///
/// With no records the list comes back unchanged. New decorators are laid
/// out with `indent` and `newline`.
#[must_use]
pub fn merge(existing: &AnnotationList, records: &[AnnotationRecord], indent: &str, newline: &str) -> AnnotationList {
    if records.is_empty() {
        return existing.clone();
    }

    let mut preserved = Vec::with_capacity(existing.len());
    let mut orphaned = Vec::new();
    let mut released_at = None;
    let mut others_at = None;
    for decorator in existing.iter() {
        let Some(kind) = EntryKind::from_decorator_name(decorator.name()) else {
            preserved.push(decorator.clone());
            continue;
        };
        if !decorator.leading().is_empty() {
            orphaned.push((preserved.len(), decorator.leading()));
        }
        match kind {
            EntryKind::Released => released_at.get_or_insert(preserved.len()),
            _ => others_at.get_or_insert(preserved.len()),
        };
    }
    let released_at = released_at.unwrap_or(0);
    let others_at = others_at.unwrap_or(preserved.len()).max(released_at);

    let (released, others): (Vec<&AnnotationRecord>, Vec<&AnnotationRecord>) =
        records.iter().partition(|record| record.kind() == EntryKind::Released);

    let mut merged = Vec::with_capacity(preserved.len() + records.len());
    let mut pending = String::new();
    for slot in 0..=preserved.len() {
        for (_, leading) in orphaned.iter().filter(|(at, _)| *at == slot) {
            pending.push_str(leading);
        }
        let mut placed: Vec<Decorator> = Vec::new();
        if slot == released_at {
            placed.extend(released.iter().map(|record| record.render(indent, newline)));
        }
        if slot == others_at {
            placed.extend(others.iter().map(|record| record.render(indent, newline)));
        }
        placed.extend(preserved.get(slot).cloned());

        for decorator in placed {
            merged.push(carry(&mut pending, decorator));
        }
    }

    merged
        .into_iter()
        .collect::<AnnotationList>()
        .with_trailing(pending + existing.trailing())
}

/// Prefix pending trivia onto `decorator`
fn carry(pending: &mut String, decorator: Decorator) -> Decorator {
    if pending.is_empty() {
        return decorator;
    }
    let leading = std::mem::take(pending) + decorator.leading();
    decorator.with_leading(leading)
}

/// Result of merging one declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// New decorator list
    pub decorators: AnnotationList,
    /// A placeholder release was inserted
    pub placeholder: bool,
    /// Printed form differs from the original list
    pub changed: bool,
}

/// Merge a declaration's decorators, applying the placeholder rule
///
/// The placeholder goes on top of test classes whose merged list has no
/// `released`. Functions never receive one.
#[must_use]
pub fn merge_declaration(
    head: &DeclHead,
    kind: DeclarationKind,
    records: &[AnnotationRecord],
    placeholder: Option<&AnnotationRecord>,
) -> Merged {
    let existing = head.decorators();
    let mut decorators = merge(existing, records, head.indent(), head.newline());

    let released = EntryKind::Released.decorator_name();
    let placeholder = match placeholder {
        Some(record) if kind == DeclarationKind::TestClass && !decorators.contains(released) => {
            let trailing = decorators.trailing().to_string();
            decorators = iter::once(record.render(head.indent(), head.newline()))
                .chain(decorators.iter().cloned())
                .collect::<AnnotationList>()
                .with_trailing(trailing);
            true
        }
        _ => false,
    };

    let changed = decorators.to_source() != existing.to_source();
    Merged {
        decorators,
        placeholder,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordArg, RecordValue};
    use pretty_assertions::assert_eq;
    use stamp_syntax::{parse_module, Item};

    fn list(lines: &[&str]) -> AnnotationList {
        lines
            .iter()
            .map(|line| Decorator::from_source("", format!("{line}\n")))
            .collect()
    }

    fn record(kind: EntryKind, reason: &str) -> AnnotationRecord {
        let args = match kind {
            EntryKind::Released => vec![RecordArg::keyword("golang", RecordValue::Str(reason.to_string()))],
            _ => vec![RecordArg::keyword("reason", RecordValue::Str(reason.to_string()))],
        };
        AnnotationRecord::new(kind, "golang", args, None)
    }

    fn printed(list: &AnnotationList) -> Vec<String> {
        list.iter().map(|d| d.text().trim_end().to_string()).collect()
    }

    #[test]
    fn no_records_leaves_list_untouched() {
        let existing = list(&["@coverage.basic", r#"@bug(reason="old")"#]);
        assert_eq!(merge(&existing, &[], "", "\n"), existing);
    }

    #[test]
    fn unrelated_decorator_stays_first() {
        let existing = list(&["@coverage.basic"]);
        let merged = merge(&existing, &[record(EntryKind::Irrelevant, "x")], "", "\n");
        assert_eq!(printed(&merged), vec!["@coverage.basic", r#"@irrelevant(reason="x")"#]);
    }

    #[test]
    fn controlled_decorators_are_replaced_in_place() {
        let existing = list(&[
            r#"@released(golang="1.0")"#,
            "@coverage.basic",
            r#"@bug(reason="old")"#,
            "@scenarios.appsec",
            r#"@missing_feature(reason="old")"#,
        ]);
        let records = [
            record(EntryKind::Released, "2.0"),
            record(EntryKind::Irrelevant, "a"),
            record(EntryKind::Bug, "b"),
        ];
        let merged = merge(&existing, &records, "", "\n");
        assert_eq!(
            printed(&merged),
            vec![
                r#"@released(golang="2.0")"#,
                "@coverage.basic",
                r#"@irrelevant(reason="a")"#,
                r#"@bug(reason="b")"#,
                "@scenarios.appsec",
            ]
        );
    }

    #[test]
    fn released_always_precedes_other_records() {
        let existing = list(&[r#"@bug(reason="old")"#, "@coverage.basic", r#"@released(golang="1.0")"#]);
        let records = [record(EntryKind::Released, "2.0"), record(EntryKind::Bug, "b")];
        let merged = merge(&existing, &records, "", "\n");
        assert_eq!(
            printed(&merged),
            vec!["@coverage.basic", r#"@released(golang="2.0")"#, r#"@bug(reason="b")"#]
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = list(&["@rfc(\"x\")", r#"@bug(reason="old")"#, "@coverage.basic"]);
        let records = [
            record(EntryKind::Released, "2.0"),
            record(EntryKind::Irrelevant, "a"),
            record(EntryKind::Irrelevant, "b"),
        ];
        let once = merge(&existing, &records, "", "\n");
        let twice = merge(&once, &records, "", "\n");
        assert_eq!(once.to_source(), twice.to_source());
        assert_eq!(
            printed(&once),
            vec![
                r#"@released(golang="2.0")"#,
                "@rfc(\"x\")",
                r#"@irrelevant(reason="a")"#,
                r#"@irrelevant(reason="b")"#,
                "@coverage.basic",
            ]
        );
    }

    #[test]
    fn records_surround_unrelated_decorator_without_anchors() {
        let existing = list(&["@coverage.basic"]);
        let records = [record(EntryKind::Released, "1.0"), record(EntryKind::Irrelevant, "x")];
        let merged = merge(&existing, &records, "", "\n");
        assert_eq!(
            printed(&merged),
            vec![r#"@released(golang="1.0")"#, "@coverage.basic", r#"@irrelevant(reason="x")"#]
        );
    }

    #[test]
    fn comment_above_replaced_decorator_is_kept() {
        let existing: AnnotationList = vec![
            Decorator::from_source("", "    @coverage.basic\n"),
            Decorator::from_source("    # flaky on arm64\n", "    @bug(reason=\"old\")\n"),
        ]
        .into_iter()
        .collect();
        let records = [record(EntryKind::Bug, "new")];
        let merged = merge(&existing, &records, "    ", "\n");
        assert_eq!(
            merged.to_source(),
            "    @coverage.basic\n    # flaky on arm64\n    @bug(reason=\"new\")\n"
        );
        assert_eq!(merge(&merged, &records, "    ", "\n"), merged);
    }

    #[test]
    fn comment_of_dropped_last_decorator_moves_below_list() {
        let existing: AnnotationList = vec![
            Decorator::from_source("", "@coverage.basic\n"),
            Decorator::from_source("# note\n", "@bug(reason=\"old\")\n"),
        ]
        .into_iter()
        .collect::<AnnotationList>()
        .with_trailing("\n");
        let records = [record(EntryKind::Released, "1.0")];
        let merged = merge(&existing, &records, "", "\n");
        assert_eq!(
            merged.to_source(),
            "@released(golang=\"1.0\")\n@coverage.basic\n# note\n\n"
        );
        assert_eq!(merge(&merged, &records, "", "\n").to_source(), merged.to_source());
    }

    fn first_head(source: &str) -> DeclHead {
        let module = parse_module(source).unwrap();
        let head = module.body().iter().find_map(Item::head).cloned();
        head.unwrap()
    }

    #[test]
    fn placeholder_on_test_class_without_release() {
        let head = first_head("@coverage.basic\nclass Test_A:\n    pass\n");
        let placeholder = MergePolicy::default().placeholder("golang").unwrap();
        let merged = merge_declaration(&head, DeclarationKind::TestClass, &[], placeholder.as_ref());
        assert!(merged.placeholder);
        assert!(merged.changed);
        assert_eq!(merged.decorators.to_source(), "@released(golang=\"?\")\n@coverage.basic\n");
    }

    #[test]
    fn no_placeholder_when_release_present_or_function() {
        let placeholder = MergePolicy::default().placeholder("golang").unwrap();

        let head = first_head("@released(java=\"1\")\nclass Test_A:\n    pass\n");
        let merged = merge_declaration(&head, DeclarationKind::TestClass, &[], placeholder.as_ref());
        assert!(!merged.placeholder);
        assert!(!merged.changed);

        let head = first_head("def test_a():\n    pass\n");
        let merged = merge_declaration(&head, DeclarationKind::TestFunction, &[], placeholder.as_ref());
        assert!(!merged.placeholder);
        assert!(merged.decorators.is_empty());
    }

    #[test]
    fn explicit_release_suppresses_placeholder() {
        let head = first_head("class Test_A:\n    pass\n");
        let placeholder = MergePolicy::default().placeholder("golang").unwrap();
        let records = [record(EntryKind::Released, "1.51.0")];
        let merged = merge_declaration(&head, DeclarationKind::TestClass, &records, placeholder.as_ref());
        assert!(!merged.placeholder);
        assert_eq!(merged.decorators.to_source(), "@released(golang=\"1.51.0\")\n");
    }

    #[test]
    fn placeholder_disabled_or_invalid() {
        let policy = MergePolicy {
            default_release: false,
            ..MergePolicy::default()
        };
        assert_eq!(policy.placeholder("golang"), Ok(None));
        assert!(matches!(
            MergePolicy::default().placeholder("php-appsec"),
            Err(SynthesisError::InvalidComponent { .. })
        ));
    }

    #[test]
    fn new_decorators_follow_declaration_layout() {
        let source = "class Test_A:\r\n    def test_b(self):\r\n        pass\r\n";
        let module = parse_module(source).unwrap();
        let Some(Item::Class(class)) = module.body().get(0) else {
            panic!("expected class");
        };
        let head = class.body().iter().find_map(Item::head).unwrap();
        let merged = merge_declaration(head, DeclarationKind::TestFunction, &[record(EntryKind::Bug, "b")], None);
        assert_eq!(merged.decorators.to_source(), "    @bug(reason=\"b\")\r\n");
    }

    #[test]
    fn is_controlled_by_name() {
        let list = list(&["@released(a=\"1\")", "@coverage.basic", "@utils.bug(reason=\"x\")"]);
        let controlled: Vec<bool> = list.iter().map(is_controlled).collect();
        assert_eq!(controlled, vec![true, false, false]);
    }
}
