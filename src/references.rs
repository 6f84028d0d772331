use tower_lsp::lsp_types::{Location, Position};

use crate::gotodef::definition_of;
use crate::symbol::{map_key_at, symbol_at, Prefix};
use crate::workspace::Snapshot;
use crate::yaml::Node;

/// Every use of the symbol at `position` in the current document.
///
/// The cursor may sit on a placeholder, a field value or a definition key under
/// `actions`/`status`. Uses are timeline `id:` values (for actions) and every
/// `prefix:key` placeholder opened by `[` or `(` and closed by `]`, `)` or a `:`
/// modifier.
pub fn references(
    snapshot: Snapshot<'_>,
    position: Position,
    include_declaration: bool,
) -> Option<Vec<Location>> {
    let ast = snapshot.ast?;
    let document = snapshot.document;
    let symbol = symbol_at(document, Some(ast), position)
        .or_else(|| map_key_at(document, ast, position))?;
    let (prefix, key) = symbol.prefix()?;

    let mut locations = Vec::new();

    if include_declaration {
        if let Some(definition) = definition_of(snapshot, prefix, key) {
            locations.push(Location {
                uri: definition.document.uri().clone(),
                range: definition.document.range(&definition.key.range),
            });
        }
    }

    if prefix == Prefix::Action {
        locations.extend(
            ast.timeline_items()
                .filter_map(|item| item.get("id"))
                .filter(|id| id.as_str() == Some(key))
                .map(|id: &Node| document_location(snapshot, id.range.start..id.range.end)),
        );
    }

    let text = document.text();
    locations.extend(
        text.match_indices(&symbol.text)
            .filter(|(index, found)| {
                let before = text[..*index].chars().next_back();
                let after = text[index + found.len()..].chars().next();
                matches!(before, Some('[' | '(')) && matches!(after, Some(':' | ']' | ')'))
            })
            .map(|(index, found)| document_location(snapshot, index..index + found.len())),
    );

    Some(locations)
}

fn document_location(snapshot: Snapshot<'_>, range: std::ops::Range<usize>) -> Location {
    Location {
        uri: snapshot.document.uri().clone(),
        range: snapshot.document.range_from_offsets(range),
    }
}
