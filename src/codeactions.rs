//! Code actions for raid documents.
//!
//! # Auto-fixes
//!
//! Diagnostics carrying [`FixData`] offer, in this order:
//!
//! | Title | Kind | Edits |
//! |-------|------|-------|
//! | `Fix this '<code>' problem` | `quickfix.<code>` | the diagnostic's own edits |
//! | `Fix all '<code>' problems` | `quickfix.<code>.all` | every fixable diagnostic of that code |
//! | `Fix all auto-fixable problems` | `quickfix.all` | every fixable diagnostic |
//!
//! Batch fixes take the fixable diagnostics of the document's last lint, skipping
//! fixes whose uniqueness key was already taken.
//!
//! # Graphing coordinates
//!
//! Inside `graphing`, a coordinate under the cursor converts between `[x, y(, rotate)]`
//! and `{ x: x, y: y(, rotate: rotate) }`. Values keep their literal text.

use std::collections::{HashMap, HashSet};

use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, Diagnostic, NumberOrString, Position, Range,
    TextEdit, Url, WorkspaceEdit,
};

use crate::diagnostics::FixData;
use crate::text_document::PositionEncoding;
use crate::workspace::Snapshot;

pub fn code_actions(
    snapshot: Snapshot<'_>,
    range: Range,
    diagnostics: &[Diagnostic],
    fixable: &[Diagnostic],
) -> Vec<CodeActionOrCommand> {
    let uri = snapshot.document.uri();
    auto_fixes(uri, diagnostics, fixable)
        .into_iter()
        .chain(graphing_conversion(snapshot, range))
        .map(CodeActionOrCommand::CodeAction)
        .collect()
}

fn code_string(diagnostic: &Diagnostic) -> Option<String> {
    match diagnostic.code.as_ref()? {
        NumberOrString::String(code) => Some(code.clone()),
        NumberOrString::Number(code) => Some(code.to_string()),
    }
}

fn edit(uri: &Url, edits: Vec<TextEdit>) -> WorkspaceEdit {
    WorkspaceEdit {
        changes: Some(HashMap::from([(uri.clone(), edits)])),
        ..Default::default()
    }
}

fn quickfix(uri: &Url, title: String, kind: String, diagnostics: Vec<Diagnostic>, edits: Vec<TextEdit>, preferred: bool) -> CodeAction {
    CodeAction {
        title,
        kind: Some(CodeActionKind::from(kind)),
        diagnostics: Some(diagnostics),
        edit: Some(edit(uri, edits)),
        is_preferred: Some(preferred),
        ..Default::default()
    }
}

fn auto_fixes(uri: &Url, diagnostics: &[Diagnostic], fixable: &[Diagnostic]) -> Vec<CodeAction> {
    let quickfix_kind = CodeActionKind::QUICKFIX;
    let quickfix_kind = quickfix_kind.as_str();
    let mut actions = Vec::new();
    // Codes in request order, with the diagnostics and edits of their batch fix.
    let mut per_code: Vec<(String, Vec<Diagnostic>, Vec<TextEdit>)> = Vec::new();

    for diagnostic in diagnostics {
        let (Some(code), Some(fix)) = (code_string(diagnostic), FixData::of(diagnostic)) else {
            continue;
        };
        if !per_code.iter().any(|(it, _, _)| *it == code) {
            per_code.push((code.clone(), Vec::new(), Vec::new()));
        }
        actions.push(quickfix(
            uri,
            format!("Fix this '{code}' problem"),
            format!("{quickfix_kind}.{code}"),
            vec![diagnostic.clone()],
            fix.text_edits,
            true,
        ));
    }

    let mut taken = HashSet::new();
    let mut all_diagnostics = Vec::new();
    let mut all_edits = Vec::new();
    for diagnostic in fixable {
        let (Some(code), Some(fix)) = (code_string(diagnostic), FixData::of(diagnostic)) else {
            continue;
        };
        if let Some(uniqueness) = &fix.uniqueness {
            if !taken.insert(uniqueness.clone()) {
                continue;
            }
        }
        if let Some((_, batch, edits)) = per_code.iter_mut().find(|(it, _, _)| *it == code) {
            batch.push(diagnostic.clone());
            edits.extend(fix.text_edits.iter().cloned());
        }
        all_diagnostics.push(diagnostic.clone());
        all_edits.extend(fix.text_edits);
    }

    for (code, batch, edits) in per_code {
        if batch.len() <= 1 {
            continue;
        }
        actions.push(quickfix(
            uri,
            format!("Fix all '{code}' problems"),
            format!("{quickfix_kind}.{code}.all"),
            batch,
            edits,
            false,
        ));
    }

    if !actions.is_empty() {
        actions.push(quickfix(
            uri,
            "Fix all auto-fixable problems".to_string(),
            format!("{quickfix_kind}.all"),
            all_diagnostics,
            all_edits,
            false,
        ));
    }

    actions
}

/// Numeric coordinate components as written.
#[derive(Debug, PartialEq)]
struct Coordinate<'a> {
    x: &'a str,
    y: &'a str,
    rotate: Option<&'a str>,
}

impl Coordinate<'_> {
    fn to_object(&self) -> String {
        match self.rotate {
            Some(rotate) => format!("{{ x: {}, y: {}, rotate: {rotate} }}", self.x, self.y),
            None => format!("{{ x: {}, y: {} }}", self.x, self.y),
        }
    }

    fn to_array(&self) -> String {
        match self.rotate {
            Some(rotate) => format!("[{}, {}, {rotate}]", self.x, self.y),
            None => format!("[{}, {}]", self.x, self.y),
        }
    }
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.parse::<f64>().is_ok_and(f64::is_finite)
}

fn parse_array(inner: &str) -> Option<Coordinate<'_>> {
    let values: Vec<&str> = inner.split(',').map(str::trim).collect();
    if !values.iter().all(|it| is_number(it)) {
        return None;
    }
    match values[..] {
        [x, y] => Some(Coordinate { x, y, rotate: None }),
        [x, y, rotate] => Some(Coordinate {
            x,
            y,
            rotate: Some(rotate),
        }),
        _ => None,
    }
}

fn parse_object(inner: &str) -> Option<Coordinate<'_>> {
    let (mut x, mut y, mut rotate) = (None, None, None);
    for item in inner.split(',') {
        let (key, value) = item.split_once(':')?;
        let key = key.trim().trim_matches(|c| c == '"' || c == '\'');
        let value = value.trim();
        if !is_number(value) {
            return None;
        }
        let slot = match key {
            "x" => &mut x,
            "y" => &mut y,
            "rotate" => &mut rotate,
            _ => return None,
        };
        *slot = Some(value);
    }
    Some(Coordinate {
        x: x?,
        y: y?,
        rotate,
    })
}

/// Finds the innermost `open ... close` pair around the cursor on one line. Returns
/// the column range and the text between the delimiters.
fn enclosing(
    encoding: PositionEncoding,
    before: &str,
    after: &str,
    open: char,
    close: char,
) -> Option<(u32, u32, String)> {
    let start = before.rfind(open)?;
    let end = after.find(close)?;
    let inner = format!("{}{}", &before[start + open.len_utf8()..], &after[..end]);
    let start_char = encoding.width(&before[..start]);
    let end_char = encoding.width(before) + encoding.width(&after[..end]) + 1;
    Some((start_char, end_char, inner))
}

fn graphing_conversion(snapshot: Snapshot<'_>, range: Range) -> Option<CodeAction> {
    let document = snapshot.document;
    let graphing = snapshot.ast?.get("graphing")?;
    if graphing.as_map().is_none()
        || !graphing.range.contains(document.offset_at(range.start))
        || !graphing.range.contains(document.offset_at(range.end))
    {
        return None;
    }

    let (before, after) = document.split_line(range.start);
    let after = after.trim_end_matches(['\n', '\r']);
    let line = range.start.line;
    let replace = |start: u32, end: u32, new_text: String| {
        vec![TextEdit {
            range: Range {
                start: Position {
                    line,
                    character: start,
                },
                end: Position {
                    line,
                    character: end,
                },
            },
            new_text,
        }]
    };

    let refactor = CodeActionKind::REFACTOR_INLINE;
    let refactor = refactor.as_str();
    let encoding = document.encoding();
    // A bracket pair that is not a coordinate may still surround an object one.
    let array = enclosing(encoding, &before, after, '[', ']')
        .and_then(|(start, end, inner)| Some((start, end, parse_array(&inner)?.to_object())));
    if let Some((start, end, object)) = array {
        return Some(CodeAction {
            title: "Convert to object notation".to_string(),
            kind: Some(CodeActionKind::from(format!("{refactor}.convert-notation.array"))),
            edit: Some(edit(document.uri(), replace(start, end, object))),
            ..Default::default()
        });
    }

    let (start, end, inner) = enclosing(encoding, &before, after, '{', '}')?;
    let coordinate = parse_object(&inner)?;
    Some(CodeAction {
        title: "Convert to array notation".to_string(),
        kind: Some(CodeActionKind::from(format!("{refactor}.convert-notation.object"))),
        edit: Some(edit(document.uri(), replace(start, end, coordinate.to_array()))),
        ..Default::default()
    })
}
