use tower_lsp::lsp_types::Position;

use crate::enums::EnumCategory;
use crate::text_document::TextDocument;
use crate::workspace::Snapshot;

/// The line text before the cursor and the two characters right before it.
pub struct Cursor {
    pub before: String,
    pub initializer: Option<char>,
    pub previous: Option<char>,
}

pub fn cursor(document: &TextDocument, line: u32, character: u32) -> Cursor {
    let (before, _) = document.split_line(Position { line, character });
    let mut reversed = before.chars().rev();
    let initializer = reversed.next();
    let previous = reversed.next();
    Cursor {
        before,
        initializer,
        previous,
    }
}

/// Keys of `common.yaml`'s `actions` or `status` map in file order.
pub fn common_keys<'a>(snapshot: Snapshot<'a>, section: &str) -> Vec<&'a str> {
    snapshot
        .enums
        .source(EnumCategory::Common)
        .and_then(|source| source.ast.get(section))
        .map(|node| node.keys().collect())
        .unwrap_or_default()
}
