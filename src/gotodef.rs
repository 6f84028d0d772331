use tower_lsp::lsp_types::{LocationLink, Position};

use crate::enums::EnumCategory;
use crate::symbol::{per_prefix, symbol_at, Prefix};
use crate::text_document::TextDocument;
use crate::workspace::Snapshot;
use crate::yaml::{Node, NodeRange};

/// The map entry defining a symbol and the document it lives in.
#[derive(Clone, Copy)]
pub struct Definition<'a> {
    pub document: &'a TextDocument,
    pub key: &'a Node,
    pub value: &'a Node,
}

impl Definition<'_> {
    /// Key start to value end.
    pub fn full_range(&self) -> NodeRange {
        NodeRange {
            start: self.key.range.start,
            end: self.value.range.end,
            end2: self.value.range.end,
        }
    }
}

/// Finds where `key` is defined: the document's own `actions`/`status` first, then
/// the common aliases, then the enum category of the prefix.
pub fn definition_of<'a>(snapshot: Snapshot<'a>, prefix: Prefix, key: &str) -> Option<Definition<'a>> {
    let local = |section: &str| -> Option<Definition<'a>> {
        let pair = snapshot.ast?.get(section)?.entry(key)?;
        Some(Definition {
            document: snapshot.document,
            key: &pair.key,
            value: &pair.value,
        })
    };
    let from_enums = |category: EnumCategory, path: &[&str]| -> Option<Definition<'a>> {
        let (source, key, value) = snapshot.enums.definition(category, path)?;
        Some(Definition {
            document: &source.document,
            key,
            value,
        })
    };

    match prefix {
        Prefix::Action => {
            local("actions").or_else(|| from_enums(EnumCategory::Common, &["actions", key]))
        }
        Prefix::Status => {
            local("status").or_else(|| from_enums(EnumCategory::Common, &["status", key]))
        }
        other => from_enums(EnumCategory::for_prefix(other)?, &[key]),
    }
}

pub fn goto_definition(snapshot: Snapshot<'_>, position: Position) -> Option<Vec<LocationLink>> {
    let symbol = symbol_at(snapshot.document, snapshot.ast, position)?;
    let definition = per_prefix(
        &symbol.text,
        |prefix, key| definition_of(snapshot, prefix, key),
        |_| None,
    )?;

    let target = definition.document;
    Some(vec![LocationLink {
        origin_selection_range: Some(symbol.range),
        target_uri: target.uri().clone(),
        target_range: target.range(&definition.full_range()),
        target_selection_range: target.range(&definition.key.range),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{enum_registry, raid_document, text_document};
    use crate::yaml::YamlDocument;
    use tower_lsp::lsp_types::Url;

    const BODY: &str = "\
actions:
  boom:
    name: Boom
    mechanic: tb.mt
timeline:
  - at: 0
    id: boom
notes: '[a:boom] [a:enrage] [m:stack] [i:tank]'
";

    fn links(needle: &str) -> Option<Vec<LocationLink>> {
        let text = raid_document(BODY);
        let document = text_document(&text);
        let ast = YamlDocument::parse(&text).unwrap();
        let enums = enum_registry();
        let snapshot = Snapshot {
            document: &document,
            ast: Some(&ast),
            enums: &enums,
        };
        let offset = text.find(needle).unwrap() + 1;
        goto_definition(snapshot, document.position_at(offset))
    }

    /// Test: a placeholder jumps to the action key, selecting the key only
    #[test]
    fn test_document_action() {
        let link = links("a:boom]").unwrap().remove(0);
        let text = raid_document(BODY);
        let key_line = text.lines().position(|line| line == "  boom:").unwrap() as u32;

        assert_eq!(link.target_uri.as_str(), "file:///workspace/raids/test.yaml");
        assert_eq!(link.target_selection_range.start.line, key_line);
        assert_eq!(link.target_selection_range.start.character, 2);
        assert_eq!(link.target_selection_range.end.character, 6);
        assert_eq!(link.target_range.start, link.target_selection_range.start);
        assert_eq!(link.target_range.end.line, key_line + 2);
        let origin = link.origin_selection_range.unwrap();
        assert_eq!(origin.end.character - origin.start.character, 6);
    }

    #[test]
    fn test_timeline_id_resolves() {
        let from_timeline = links("id: boom").unwrap();
        let from_placeholder = links("a:boom]").unwrap();
        assert_eq!(from_timeline[0].target_range, from_placeholder[0].target_range);
    }

    /// Test: common aliases and enum entries jump into the enum documents
    #[test]
    fn test_enum_targets() {
        let common = links("a:enrage]").unwrap();
        assert_eq!(common[0].target_uri, Url::parse("file:///enums/common.yaml").unwrap());
        assert_eq!(common[0].target_selection_range.start.line, 2);

        let mechanic = links("m:stack]").unwrap();
        assert_eq!(mechanic[0].target_uri, Url::parse("file:///enums/mechanic-types.yaml").unwrap());
        assert_eq!(mechanic[0].target_selection_range.start.line, 11);

        let field = links("tb.mt").unwrap();
        assert_eq!(field[0].target_selection_range.start.line, 15);
    }

    #[test]
    fn test_icons_have_no_definition() {
        assert!(links("i:tank]").is_none());
    }
}
