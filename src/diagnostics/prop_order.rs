use std::ops::ControlFlow;

use tower_lsp::lsp_types::{Position, Range, TextEdit};

use super::{related, warning, FixData, LintContext};
use crate::prop_order::{Direction, PropertyOrder};
use crate::yaml::{Node, Pair};

/// Checks the key order of one map of `kind` against the learned order, learning
/// from it when it agrees. `fixable` attaches a move-the-line fix.
pub(super) fn validate_property_order(
    context: &mut LintContext<'_>,
    map: &Node,
    kind: &str,
    fixable: bool,
) -> ControlFlow<()> {
    let Some(pairs) = map.as_map() else {
        return ControlFlow::Continue(());
    };
    let mut keys_before: Vec<&str> = Vec::new();

    for (i, pair) in pairs.iter().enumerate() {
        let Some(key) = pair.key_str() else {
            continue;
        };
        let after = i.checked_sub(1).and_then(|it| pairs[it].key_str());
        let before = pairs.get(i + 1).and_then(Pair::key_str);
        let key_range = context.range(&pair.key.range);
        let location = context.location(key_range);

        let Some(learned) = context.memory.get(kind, key).cloned() else {
            context.memory.learn(
                kind,
                key,
                PropertyOrder {
                    location,
                    after: after.map(str::to_string),
                    before: before.map(str::to_string),
                },
            );
            keys_before.push(key);
            continue;
        };

        let present = |candidate: &str| map.has(candidate);
        let order_after = context.memory.anchor(kind, key, Direction::After, present);
        let order_before = context.memory.anchor(kind, key, Direction::Before, present);

        let violated = order_after
            .as_deref()
            .is_some_and(|it| !keys_before.contains(&it))
            || order_before
                .as_deref()
                .is_some_and(|it| keys_before.contains(&it));

        if !violated {
            context.memory.extend(kind, key, after, before, location);
            keys_before.push(key);
            continue;
        }

        let anchor = match (&order_after, &order_before) {
            (Some(anchor), _) => map
                .entry(anchor)
                .map(|it| (it, format!("'{key}' should come after '{anchor}'."))),
            (None, Some(anchor)) => map
                .entry(anchor)
                .map(|it| (it, format!("'{key}' should come before '{anchor}'."))),
            (None, None) => None,
        };
        let Some((anchor, hint)) = anchor else {
            keys_before.push(key);
            continue;
        };

        let data = match fixable {
            true => Some(move_fix(context, map, pair, anchor, order_after.is_some())),
            false => None,
        };

        let diagnostic = tower_lsp::lsp_types::Diagnostic {
            related_information: Some(vec![
                related(context.location(context.range(&anchor.key.range)), hint),
                related(
                    learned.location.clone(),
                    format!("The order of '{key}' was last adjusted here."),
                ),
            ]),
            data: data.and_then(|it| serde_json::to_value(it).ok()),
            ..warning(
                &format!("inconsistent-prop-order/{}", kind.replace(' ', "-")),
                format!("The order of this '{key}' is inconsistent."),
                key_range,
            )
        };
        context.add(diagnostic)?;
        keys_before.push(key);
    }

    ControlFlow::Continue(())
}

/// Cuts the entry's full lines and reinserts them next to the anchor entry.
fn move_fix(
    context: &LintContext<'_>,
    map: &Node,
    pair: &Pair,
    anchor: &Pair,
    insert_after: bool,
) -> FixData {
    let document = context.document;
    let mut current = document.range_from_offsets(pair.key.range.start..pair.value.range.end2);
    current.start = Position {
        line: current.start.line,
        character: 0,
    };

    let mut moved = document.get_text(current).to_string();
    if !moved.ends_with('\n') {
        moved.push('\n');
    }

    let insertion: Range = match insert_after {
        true => document.line_start_range(anchor.value.range.end2),
        false => document.line_start_range(anchor.key.range.start),
    };

    FixData {
        text_edits: vec![
            TextEdit {
                range: current,
                new_text: String::new(),
            },
            TextEdit {
                range: insertion,
                new_text: moved,
            },
        ],
        uniqueness: Some(map.range.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::{lint, FixData};
    use crate::prop_order::PropertyOrderMemory;
    use crate::test_utils::{code_of, enum_registry, raid_document, text_document, with_code};
    use crate::yaml::YamlDocument;

    const LEARN: &str = "\
actions:
  first:
    name: First
    mechanic: raidwide
    damage: 1000
";

    const SWAPPED: &str = "\
actions:
  second:
    mechanic: raidwide
    name: Second
    damage: 1000
";

    fn lint_with(memory: &mut PropertyOrderMemory, body: &str) -> crate::diagnostics::LintResult {
        let text = raid_document(body);
        let document = text_document(&text);
        let ast = YamlDocument::parse(&text).unwrap();
        lint(&document, &ast, &enum_registry(), memory, 1000)
    }

    /// Test: an order learned from one document is enforced on the next
    #[test]
    fn test_learned_order_is_enforced() {
        let mut memory = PropertyOrderMemory::new();
        assert!(lint_with(&mut memory, LEARN).diagnostics.is_empty());

        let result = lint_with(&mut memory, SWAPPED);
        let found = with_code(&result.diagnostics, "inconsistent-prop-order/action");
        assert_eq!(found.len(), 2, "Diagnostics: {:?}", result.diagnostics);
        assert!(found[0].message.contains("'mechanic'"));
        assert!(found[1].message.contains("'name'"));

        let uniqueness: Vec<_> = result
            .fixable
            .iter()
            .filter_map(FixData::of)
            .map(|it| it.uniqueness)
            .collect();
        assert_eq!(uniqueness.len(), 2);
        assert_eq!(uniqueness[0], uniqueness[1], "Both fixes touch the same map");
    }

    /// Test: the fix moves the offending line below its anchor
    #[test]
    fn test_fix_moves_line() {
        let mut memory = PropertyOrderMemory::new();
        lint_with(&mut memory, LEARN);
        let result = lint_with(&mut memory, SWAPPED);
        let fix = FixData::of(&result.fixable[0]).unwrap();

        assert_eq!(fix.text_edits.len(), 2);
        assert_eq!(fix.text_edits[0].new_text, "");
        assert_eq!(fix.text_edits[0].range.start.character, 0);
        assert_eq!(fix.text_edits[1].new_text, "    mechanic: raidwide\n");
        assert_eq!(
            fix.text_edits[1].range.start.line,
            fix.text_edits[0].range.start.line + 2,
            "Insert on the line after 'name'"
        );
        assert!(fix.uniqueness.is_some());
    }

    /// Test: timeline items are reported but never auto-fixed
    #[test]
    fn test_timeline_items_have_no_fix() {
        let mut memory = PropertyOrderMemory::new();
        lint_with(&mut memory, "timeline:\n  - at: 0\n    id: <phase>\n");
        let result = lint_with(&mut memory, "timeline:\n  - id: <phase>\n    at: 0\n");
        let found = with_code(&result.diagnostics, "inconsistent-prop-order/timeline-item");
        assert!(!found.is_empty());
        assert!(found.iter().all(|it| it.data.is_none()));
        assert!(result.fixable.is_empty());
    }

    /// Test: relinting after the order stabilised yields identical results
    #[test]
    fn test_relint_is_idempotent() {
        let mut memory = PropertyOrderMemory::new();
        lint_with(&mut memory, LEARN);
        let first = lint_with(&mut memory, SWAPPED).diagnostics;
        let second = lint_with(&mut memory, SWAPPED).diagnostics;
        assert_eq!(first, second);
        assert!(first.iter().any(|it| code_of(it).is_some()));
    }
}
