//! Placeholder Completer
//!
//! Completes placeholders in free text.
//!
//! ## Trigger Pattern
//! - `[` - square placeholder, also offers `fight`, `boss` and the icons
//! - `](` - round placeholder after a label
//!
//! ## Sorting
//! Document actions and statuses sort before the common aliases of the same prefix
//! (`a1:` before `a2:`).

use tower_lsp::lsp_types::CompletionItemKind;

use super::util::{common_keys, cursor};
use super::{Completable, Completer, Entry};
use crate::enums::EnumCategory;
use crate::symbol::{Delimiter, Prefix, ICONS};
use crate::workspace::Snapshot;
use crate::yaml::Node;

const ENUM_PREFIXES: [Prefix; 5] = [
    Prefix::Term,
    Prefix::Mechanic,
    Prefix::MechanicShape,
    Prefix::StatusType,
    Prefix::DamageType,
];

pub struct PlaceholderCompleter<'a> {
    snapshot: Snapshot<'a>,
    delimiter: Delimiter,
}

impl PlaceholderCompleter<'_> {
    fn close(&self) -> char {
        match self.delimiter {
            Delimiter::Square => ']',
            Delimiter::Round => ')',
        }
    }

    fn entry(&self, label: String) -> Entry {
        Entry::new(label, CompletionItemKind::ENUM_MEMBER).commit(self.close())
    }

    /// Document definitions of a section, then the common aliases.
    fn definitions(&self, prefix: Prefix, section: &str, common_section: &str) -> Vec<Entry> {
        let tag = prefix.tag();
        let local = self
            .snapshot
            .ast
            .map(|ast| ast.section(section))
            .unwrap_or_default()
            .iter()
            .filter_map(|pair| {
                let key = pair.key.as_str()?;
                let description = pair.value.get("description").and_then(Node::as_str);
                Some(
                    self.entry(prefix.qualify(key))
                        .description(description)
                        .sort_text(format!("{tag}1:{key}")),
                )
            });
        let common = common_keys(self.snapshot, common_section).into_iter().map(|key| {
            self.entry(prefix.qualify(key))
                .description(Some("from enums/common.yaml"))
                .sort_text(format!("{tag}2:{key}"))
        });
        local.chain(common).collect()
    }
}

impl<'a> Completer<'a> for PlaceholderCompleter<'a> {
    fn construct(snapshot: Snapshot<'a>, line: u32, character: u32) -> Option<Self> {
        let cursor = cursor(snapshot.document, line, character);
        let delimiter = match (cursor.initializer?, cursor.previous) {
            ('[', _) => Delimiter::Square,
            ('(', Some(']')) => Delimiter::Round,
            _ => return None,
        };
        Some(PlaceholderCompleter {
            snapshot,
            delimiter,
        })
    }

    fn completions(&self) -> Vec<impl Completable<'a, Self>> {
        let mut entries = Vec::new();

        if self.delimiter == Delimiter::Square {
            entries.push(
                Entry::new("fight", CompletionItemKind::REFERENCE)
                    .description(Some("Name of the fight"))
                    .commit(']'),
            );
            entries.push(
                Entry::new("boss", CompletionItemKind::REFERENCE)
                    .description(Some("Name of the boss"))
                    .commit(']'),
            );
            entries.extend(
                ICONS
                    .iter()
                    .map(|icon| self.entry(Prefix::Icon.qualify(icon)).description(Some("icon"))),
            );
        }

        entries.extend(self.definitions(Prefix::Action, "actions", "actions"));
        entries.extend(self.definitions(Prefix::Status, "status", "status"));

        let enums = self.snapshot.enums;
        for prefix in ENUM_PREFIXES {
            let Some(category) = EnumCategory::for_prefix(prefix) else {
                continue;
            };
            entries.extend(enums.keys(category).into_iter().map(|key| {
                let description = enums.describe(category, key).map(|it| it.1);
                self.entry(prefix.qualify(key)).description(description)
            }));
        }

        entries
    }
}
