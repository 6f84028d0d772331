//! Hover provider for raid documents.
//!
//! Shows `## name` followed by a description for the symbol under the cursor.
//!
//! # Hover Targets
//!
//! | Prefix | Shows |
//! |--------|-------|
//! | `a:` | Action description, or a note for common aliases |
//! | `s:` | Status description, or a note for common aliases |
//! | `m:`, `ms:`, `st:`, `dt:` | Enum entry name and description |
//! | `t:` | Term text |
//! | `i:` | Icon name |
//!
//! # Configuration
//!
//! Hover can be disabled via [`Settings::hover`]:
//!
//! ```toml
//! hover = false
//! ```

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

use crate::config::Settings;
use crate::enums::EnumCategory;
use crate::symbol::{per_prefix, symbol_at, Prefix, ICONS, SPECIAL_TIMELINE_IDS};
use crate::workspace::Snapshot;
use crate::yaml::Node;

/// Describe the symbol at `position`.
///
/// Returns `None` when hover is disabled, when the cursor is not on a symbol, or when
/// the symbol does not resolve.
pub fn hover(snapshot: Snapshot<'_>, position: Position, settings: &Settings) -> Option<Hover> {
    if !settings.hover {
        return None;
    }

    let symbol = symbol_at(snapshot.document, snapshot.ast, position)?;
    let (name, description) = per_prefix(
        &symbol.text,
        |prefix, key| describe(snapshot, prefix, key),
        |_| None,
    )?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("## {name}\n\n{description}"),
        }),
        range: Some(symbol.range),
    })
}

fn describe(snapshot: Snapshot<'_>, prefix: Prefix, key: &str) -> Option<(String, String)> {
    let common = snapshot.enums.common();
    let text = |node: &Node, field: &str| node.get(field).and_then(Node::as_str).map(str::to_string);

    match prefix {
        Prefix::Action => {
            if let Some(action) = snapshot.ast.and_then(|ast| ast.action(key)).map(|it| &it.value) {
                let description = text(action, "description").unwrap_or_else(|| "Action.".to_string());
                Some((key.to_string(), description))
            } else if common.is_some_and(|it| it.actions.contains_key(key)) {
                Some((key.to_string(), "Common action (`enums/common.yaml`).".to_string()))
            } else if SPECIAL_TIMELINE_IDS.contains(&key) {
                Some((key.to_string(), "Special timeline event.".to_string()))
            } else {
                None
            }
        }
        Prefix::Status => {
            if let Some(status) = snapshot.ast.and_then(|ast| ast.status(key)).map(|it| &it.value) {
                let description =
                    text(status, "description").unwrap_or_else(|| "Status effect.".to_string());
                Some((key.to_string(), description))
            } else if common.is_some_and(|it| it.status.contains_key(key)) {
                Some((key.to_string(), "Common status (`enums/common.yaml`).".to_string()))
            } else {
                None
            }
        }
        Prefix::Icon => ICONS
            .contains(&key)
            .then(|| (key.to_string(), "Icon.".to_string())),
        other => snapshot.enums.describe(EnumCategory::for_prefix(other)?, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::EnumRegistry;
    use crate::test_utils::{enum_registry, raid_document, text_document};
    use crate::yaml::YamlDocument;

    const BODY: &str = "\
actions:
  boom:
    name: Boom
    description: Big explosion.
    mechanic: raidwide
  quiet:
    name: Quiet
    mechanic: aoe
status:
  burn:
    type: dot
notes: '[a:boom] [a:auto] [s:burn] [m:stack] [t:tb] [dt:magical] [i:tank] [a:ghost]'
";

    fn hover_text(enums: &EnumRegistry, text: &str, needle: &str) -> Option<String> {
        let document = text_document(text);
        let ast = YamlDocument::parse(text).unwrap();
        let offset = text.find(needle).unwrap() + 1;
        let snapshot = Snapshot {
            document: &document,
            ast: Some(&ast),
            enums,
        };
        hover(snapshot, document.position_at(offset), &Settings::default()).map(|it| {
            match it.contents {
                HoverContents::Markup(markup) => markup.value,
                other => panic!("unexpected hover contents {other:?}"),
            }
        })
    }

    #[test]
    fn test_document_symbols() {
        let enums = enum_registry();
        let text = raid_document(BODY);
        assert_eq!(
            hover_text(&enums, &text, "a:boom]").as_deref(),
            Some("## boom\n\nBig explosion.")
        );
        assert_eq!(
            hover_text(&enums, &text, "s:burn]").as_deref(),
            Some("## burn\n\nStatus effect.")
        );
        assert_eq!(
            hover_text(&enums, &text, "a:auto]").as_deref(),
            Some("## auto\n\nCommon action (`enums/common.yaml`).")
        );
        assert!(hover_text(&enums, &text, "a:ghost]").is_none());
    }

    /// Test: enum entries show their display name, terms show the key
    #[test]
    fn test_enum_symbols() {
        let enums = enum_registry();
        let text = raid_document(BODY);
        assert_eq!(
            hover_text(&enums, &text, "m:stack]").as_deref(),
            Some("## Stack\n\nShared damage.")
        );
        assert_eq!(hover_text(&enums, &text, "t:tb]").as_deref(), Some("## tb\n\nTankbuster"));
        assert_eq!(
            hover_text(&enums, &text, "dt:magical]").as_deref(),
            Some("## Magical\n\nMagical damage.")
        );
    }

    /// Test: a field value resolves the same way as a placeholder
    #[test]
    fn test_field_value_hover() {
        let enums = enum_registry();
        let text = raid_document(BODY);
        assert_eq!(
            hover_text(&enums, &text, "aoe").as_deref(),
            Some("## AoE\n\nAvoidable area of effect.")
        );
    }

    #[test]
    fn test_hover_disabled() {
        let text = raid_document(BODY);
        let document = text_document(&text);
        let enums = enum_registry();
        let snapshot = Snapshot {
            document: &document,
            ast: None,
            enums: &enums,
        };
        let settings = Settings {
            hover: false,
            ..Settings::default()
        };
        let position = document.position_at(text.find("t:tb").unwrap() + 1);
        assert!(hover(snapshot, position, &settings).is_none());
        assert!(hover(snapshot, position, &Settings::default()).is_some());
    }
}
