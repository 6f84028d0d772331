//! Value Completer
//!
//! Completes the value of a known field right after its colon:
//!
//! - `id:` in a timeline or `children` item: document actions, then common aliases
//! - `mechanic:`: mechanic types
//! - `shape:`: mechanic shapes
//! - `type:`: status types under `status`, damage types elsewhere

use tower_lsp::lsp_types::{CompletionItemKind, Position};

use super::util::{common_keys, cursor};
use super::{Completable, Completer, Entry};
use crate::enums::EnumCategory;
use crate::workspace::Snapshot;
use crate::yaml::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Enum(EnumCategory),
}

pub struct ValueCompleter<'a> {
    snapshot: Snapshot<'a>,
    field: Field,
    /// Completing right after the colon needs a separating space.
    after_colon: bool,
}

impl<'a> Completer<'a> for ValueCompleter<'a> {
    fn construct(snapshot: Snapshot<'a>, line: u32, character: u32) -> Option<Self> {
        let cursor = cursor(snapshot.document, line, character);
        let after_colon = match cursor.initializer? {
            ':' => true,
            ' ' => false,
            _ => return None,
        };

        let entry = cursor.before.trim_start();
        let entry = entry.strip_prefix("- ").unwrap_or(entry);
        let (name, rest) = entry.split_once(':')?;
        if !rest.trim().is_empty() {
            return None;
        }

        let field = match name {
            "id" => Field::Id,
            "mechanic" => Field::Enum(EnumCategory::MechanicTypes),
            "shape" => Field::Enum(EnumCategory::MechanicShapes),
            "type" => {
                let offset = snapshot.document.offset_at(Position { line, character });
                if snapshot.ast.is_some_and(|ast| ast.in_section("status", offset)) {
                    Field::Enum(EnumCategory::StatusTypes)
                } else {
                    Field::Enum(EnumCategory::DamageTypes)
                }
            }
            _ => return None,
        };

        let available = match field {
            Field::Id => snapshot.ast.is_some_and(|ast| ast.get("actions").is_some()),
            Field::Enum(category) => snapshot.enums.is_loaded(category),
        };
        available.then_some(ValueCompleter {
            snapshot,
            field,
            after_colon,
        })
    }

    fn completions(&self) -> Vec<impl Completable<'a, Self>> {
        let kind = CompletionItemKind::ENUM_MEMBER;
        let entries: Vec<Entry> = match self.field {
            Field::Id => {
                let actions = self
                    .snapshot
                    .ast
                    .map(|ast| ast.section("actions"))
                    .unwrap_or_default();
                let local = actions.iter().filter_map(|pair| {
                    let key = pair.key.as_str()?;
                    let description = pair.value.get("description").and_then(Node::as_str);
                    Some(Entry::new(key, kind).description(description))
                });
                let common = common_keys(self.snapshot, "actions")
                    .into_iter()
                    .map(|key| Entry::new(key, kind).description(Some("from enums/common.yaml")));
                local.chain(common).collect()
            }
            Field::Enum(category) => self
                .snapshot
                .enums
                .keys(category)
                .into_iter()
                .map(|key| {
                    let description = self.snapshot.enums.describe(category, key).map(|it| it.1);
                    Entry::new(key, kind).description(description)
                })
                .collect(),
        };

        if !self.after_colon {
            return entries;
        }
        entries
            .into_iter()
            .map(|entry| {
                let insert = format!(" {}", entry.label);
                entry.insert_text(insert)
            })
            .collect()
    }
}
