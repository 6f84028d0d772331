//! Completion for raid documents.
//!
//! Completers are tried in order and the first one that recognizes the text before
//! the cursor answers the request.
//!
//! | Completer | Trigger | Offers |
//! |-----------|---------|--------|
//! | [`ValueCompleter`] | `id: `, `mechanic: `, `shape: `, `type: ` | actions or enum keys |
//! | [`UnverifiedCompleter`] | `:` | `unverified()` |
//! | [`PlaceholderCompleter`] | `[` or `](` | every `prefix:key` placeholder |

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, CompletionList,
    CompletionResponse, Position,
};

use crate::workspace::Snapshot;

use self::placeholder_completer::PlaceholderCompleter;
use self::unverified_completer::UnverifiedCompleter;
use self::value_completer::ValueCompleter;

mod placeholder_completer;
mod unverified_completer;
mod util;
mod value_completer;

pub trait Completer<'a>: Sized {
    fn construct(snapshot: Snapshot<'a>, line: u32, character: u32) -> Option<Self>;

    fn completions(&self) -> Vec<impl Completable<'a, Self>>;
}

pub trait Completable<'a, T: Completer<'a>>: Sized {
    fn completions(&self, completer: &T) -> Option<CompletionItem>;
}

/// A plain completion entry shared by the completers.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub label: String,
    pub description: Option<String>,
    pub kind: CompletionItemKind,
    pub sort_text: Option<String>,
    pub insert_text: Option<String>,
    pub commit: Option<char>,
}

impl Entry {
    pub fn new(label: impl Into<String>, kind: CompletionItemKind) -> Entry {
        Entry {
            label: label.into(),
            description: None,
            kind,
            sort_text: None,
            insert_text: None,
            commit: None,
        }
    }

    pub fn description(mut self, description: Option<impl Into<String>>) -> Entry {
        self.description = description.map(Into::into);
        self
    }

    pub fn sort_text(mut self, sort_text: String) -> Entry {
        self.sort_text = Some(sort_text);
        self
    }

    pub fn insert_text(mut self, insert_text: String) -> Entry {
        self.insert_text = Some(insert_text);
        self
    }

    pub fn commit(mut self, commit: char) -> Entry {
        self.commit = Some(commit);
        self
    }
}

impl<'a, T: Completer<'a>> Completable<'a, T> for Entry {
    fn completions(&self, _completer: &T) -> Option<CompletionItem> {
        Some(CompletionItem {
            label: self.label.clone(),
            label_details: self.description.as_ref().map(|description| {
                CompletionItemLabelDetails {
                    detail: None,
                    description: Some(description.clone()),
                }
            }),
            kind: Some(self.kind),
            sort_text: self.sort_text.clone(),
            insert_text: self.insert_text.clone(),
            commit_characters: self.commit.map(|commit| vec![commit.to_string()]),
            ..Default::default()
        })
    }
}

pub fn get_completions(snapshot: Snapshot<'_>, position: Position) -> Option<CompletionResponse> {
    let Position { line, character } = position;

    run_completer::<ValueCompleter>(snapshot, line, character)
        .or_else(|| run_completer::<UnverifiedCompleter>(snapshot, line, character))
        .or_else(|| run_completer::<PlaceholderCompleter>(snapshot, line, character))
}

fn run_completer<'a, T: Completer<'a>>(
    snapshot: Snapshot<'a>,
    line: u32,
    character: u32,
) -> Option<CompletionResponse> {
    let completer = T::construct(snapshot, line, character)?;
    let items = completer
        .completions()
        .into_iter()
        .filter_map(|completable| completable.completions(&completer))
        .collect::<Vec<CompletionItem>>();

    Some(CompletionResponse::List(CompletionList {
        is_incomplete: false,
        items,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::enums::EnumRegistry;
    use crate::test_utils::{enum_registry, raid_document, text_document};
    use crate::text_document::TextDocument;
    use crate::yaml::YamlDocument;

    pub const BODY: &str = "\
actions:
  boom:
    name: Boom
    description: Big explosion.
    mechanic:
status:
  burn:
    type: dot
timeline:
  - at: 0
    id:
notes: 'Uses [ and [Boom]( and x:'
";

    pub struct Fixture {
        pub text: String,
        pub document: TextDocument,
        pub ast: YamlDocument,
        pub enums: EnumRegistry,
    }

    impl Fixture {
        pub fn new() -> Fixture {
            let text = raid_document(BODY);
            Fixture {
                document: text_document(&text),
                ast: YamlDocument::parse(&text).unwrap(),
                enums: enum_registry(),
                text,
            }
        }

        pub fn snapshot(&self) -> Snapshot<'_> {
            Snapshot {
                document: &self.document,
                ast: Some(&self.ast),
                enums: &self.enums,
            }
        }

        /// Position right after the end of `needle`.
        pub fn after(&self, needle: &str) -> Position {
            let offset = self.text.find(needle).unwrap() + needle.len();
            self.document.position_at(offset)
        }

        pub fn labels(&self, needle: &str) -> Vec<String> {
            match get_completions(self.snapshot(), self.after(needle)) {
                Some(CompletionResponse::List(list)) => {
                    list.items.into_iter().map(|it| it.label).collect()
                }
                Some(CompletionResponse::Array(items)) => items.into_iter().map(|it| it.label).collect(),
                None => Vec::new(),
            }
        }
    }

    /// Test: each trigger reaches the completer that owns it
    #[test]
    fn test_completer_order() {
        let fixture = Fixture::new();
        assert_eq!(fixture.labels("    id:"), vec!["boom", "auto", "enrage"]);
        assert_eq!(fixture.labels("x:"), vec!["unverified"]);
        assert!(fixture.labels("Uses [").contains(&"a:boom".to_string()));
        assert!(fixture.labels("Big").is_empty());
    }

    #[test]
    fn test_entry_item() {
        let entry = Entry::new("t:tb", CompletionItemKind::ENUM_MEMBER)
            .description(Some("Tankbuster"))
            .commit(']');
        let fixture = Fixture::new();
        let position = fixture.after("x:");
        let completer =
            UnverifiedCompleter::construct(fixture.snapshot(), position.line, position.character)
                .unwrap();
        let item = Completable::completions(&entry, &completer).unwrap();

        assert_eq!(item.label, "t:tb");
        assert_eq!(item.label_details.unwrap().description.as_deref(), Some("Tankbuster"));
        assert_eq!(item.commit_characters, Some(vec!["]".to_string()]));
    }
}
