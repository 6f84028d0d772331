use tower_lsp::lsp_types::CompletionItemKind;

use super::util::cursor;
use super::{Completable, Completer, Entry};
use crate::workspace::Snapshot;

/// Offers the `unverified()` marker after any `:`.
pub struct UnverifiedCompleter;

impl<'a> Completer<'a> for UnverifiedCompleter {
    fn construct(snapshot: Snapshot<'a>, line: u32, character: u32) -> Option<Self> {
        let cursor = cursor(snapshot.document, line, character);
        (cursor.initializer == Some(':')).then_some(UnverifiedCompleter)
    }

    fn completions(&self) -> Vec<impl Completable<'a, Self>> {
        vec![Entry::new("unverified", CompletionItemKind::KEYWORD)
            .description(Some("Unverified information"))
            .insert_text("unverified()".to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::tests::Fixture;

    #[test]
    fn test_unverified_after_colon() {
        let fixture = Fixture::new();
        let position = fixture.after("x:");
        let completer =
            UnverifiedCompleter::construct(fixture.snapshot(), position.line, position.character)
                .unwrap();
        let completions = completer.completions();
        let item = completions[0].completions(&completer).unwrap();

        assert_eq!(item.label, "unverified");
        assert_eq!(item.insert_text.as_deref(), Some("unverified()"));
        assert_eq!(item.kind, Some(CompletionItemKind::KEYWORD));
    }

    #[test]
    fn test_other_characters() {
        let fixture = Fixture::new();
        let position = fixture.after("Uses [");
        assert!(
            UnverifiedCompleter::construct(fixture.snapshot(), position.line, position.character)
                .is_none()
        );
    }
}
