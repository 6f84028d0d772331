//! Symbol resolution for raid documents.
//!
//! Maps a cursor position (or a regex match in raw text) to a typed reference of the
//! form `prefix:key`. Every editor feature goes through [`symbol_at`] and dispatches
//! on the prefix with [`per_prefix`].
//!
//! # Recognized Forms
//!
//! | Form | Example | Delimiter |
//! |------|---------|-----------|
//! | Square placeholder | `[a:boom]`, `[t:tb:c]` | [`Delimiter::Square`] |
//! | Round placeholder | `[Boom](a:boom)` | [`Delimiter::Round`] |
//! | Timeline / children id | `  - id: boom` | none (`a:` synthesized) |
//! | Action fields | `    mechanic: aoe` | none (`m:`, `ms:`, `dt:`) |
//! | Status fields | `    type: dot` | none (`st:`) |

use std::fmt;
use std::ops::Range as ByteRange;

use once_cell::sync::Lazy;
use regex::Regex;
use tower_lsp::lsp_types::{Position, Range};

use crate::text_document::TextDocument;
use crate::yaml::YamlDocument;

/// Matches `(prefix:key)` and `[prefix:key]`, the latter with an optional `:c`/`:d` modifier.
pub static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\((?P<round>(?:a|s|m|ms|st|dt|t|i):[A-Za-z0-9\-_.()]+)\)|\[(?P<square>(?:a|s|m|ms|st|dt|t|i):[A-Za-z0-9\-_.()]+?)(?::c|:d)?\]",
    )
    .unwrap()
});

/// Timeline ids the simulator handles without an action definition.
pub const SPECIAL_TIMELINE_IDS: [&str; 7] = [
    "<phase>",
    "<endphase>",
    "<targetable>",
    "<untargetable>",
    "<addstatus>",
    "<removestatus>",
    "<loop>",
];

pub const ICONS: [&str; 11] = [
    "tank", "healer", "dps", "melee", "ranged", "pranged", "caster", "circle", "cross", "square",
    "triangle",
];

static MAP_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{2}([^\s:]+):(?:\s|$)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    Action,
    Status,
    Mechanic,
    MechanicShape,
    StatusType,
    DamageType,
    Term,
    Icon,
}

impl Prefix {
    pub const ALL: [Prefix; 8] = [
        Prefix::Action,
        Prefix::Status,
        Prefix::Mechanic,
        Prefix::MechanicShape,
        Prefix::StatusType,
        Prefix::DamageType,
        Prefix::Term,
        Prefix::Icon,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Prefix::Action => "a",
            Prefix::Status => "s",
            Prefix::Mechanic => "m",
            Prefix::MechanicShape => "ms",
            Prefix::StatusType => "st",
            Prefix::DamageType => "dt",
            Prefix::Term => "t",
            Prefix::Icon => "i",
        }
    }

    /// Human readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Prefix::Action => "action",
            Prefix::Status => "status effect",
            Prefix::Mechanic => "mechanic type",
            Prefix::MechanicShape => "mechanic shape",
            Prefix::StatusType => "status effect type",
            Prefix::DamageType => "damage type",
            Prefix::Term => "term",
            Prefix::Icon => "icon",
        }
    }

    /// Splits `prefix:key` into its parts.
    pub fn parse(text: &str) -> Option<(Prefix, &str)> {
        let (tag, key) = text.split_once(':')?;
        Prefix::ALL
            .into_iter()
            .find(|prefix| prefix.tag() == tag)
            .map(|prefix| (prefix, key))
    }

    pub fn qualify(self, key: &str) -> String {
        format!("{}:{}", self.tag(), key)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.tag())
    }
}

/// Runs `handler` with the parsed prefix and key, or `otherwise` with the whole text
/// when no known prefix matches.
pub fn per_prefix<T>(
    text: &str,
    handler: impl FnOnce(Prefix, &str) -> Option<T>,
    otherwise: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    match Prefix::parse(text) {
        Some((prefix, key)) => handler(prefix, key),
        None => otherwise(text),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Square,
    Round,
}

impl Delimiter {
    fn pair(self) -> (char, char) {
        match self {
            Delimiter::Square => ('[', ']'),
            Delimiter::Round => ('(', ')'),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRef {
    /// `prefix:key`, modifiers stripped.
    pub text: String,
    pub range: Range,
    pub delimiter: Option<Delimiter>,
}

impl SymbolRef {
    pub fn prefix(&self) -> Option<(Prefix, &str)> {
        Prefix::parse(&self.text)
    }
}

/// A placeholder found in raw text: `prefix:key` and the byte range of that text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderMatch {
    pub text: String,
    pub range: ByteRange<usize>,
}

pub fn placeholders(text: &str) -> impl Iterator<Item = PlaceholderMatch> + '_ {
    PLACEHOLDER_REGEX.captures_iter(text).filter_map(|captures| {
        let group = captures.name("round").or_else(|| captures.name("square"))?;
        Some(PlaceholderMatch {
            text: group.as_str().to_string(),
            range: group.range(),
        })
    })
}

/// Resolves the symbol under the cursor: placeholders first, then field heuristics
/// scoped by the enclosing top-level section.
pub fn symbol_at(
    document: &TextDocument,
    ast: Option<&YamlDocument>,
    position: Position,
) -> Option<SymbolRef> {
    if let Some(symbol) = placeholder_at(document, position).filter(|it| it.prefix().is_some()) {
        return Some(symbol);
    }

    let ast = ast?;
    let offset = document.offset_at(position);
    let in_actions = ast.in_section("actions", offset) || ast.in_section("autos", offset);
    let in_status = ast.in_section("status", offset);
    let in_items = ast.in_section("timeline", offset) || in_children(ast, offset);

    let candidates = [
        ("id", Prefix::Action, in_items),
        ("mechanic", Prefix::Mechanic, in_actions),
        ("shape", Prefix::MechanicShape, in_actions),
        ("type", Prefix::DamageType, in_actions),
        ("type", Prefix::StatusType, in_status),
    ];

    candidates
        .into_iter()
        .filter(|(_, _, in_scope)| *in_scope)
        .find_map(|(key, prefix, _)| {
            let value = key_value_at(document, position, key)?;
            tracing::debug!(key, prefix = prefix.tag(), value = %value.text, "resolved field symbol");
            Some(SymbolRef {
                text: prefix.qualify(&value.text),
                ..value
            })
        })
}

fn in_children(ast: &YamlDocument, offset: usize) -> bool {
    ast.section("actions").iter().any(|pair| {
        pair.value
            .get("children")
            .is_some_and(|children| children.range.contains(offset))
    })
}

/// Finds the `[...]` or `[label](...)` placeholder the cursor is in.
pub fn placeholder_at(document: &TextDocument, position: Position) -> Option<SymbolRef> {
    let (line_before, line_after) = document.split_line(position);

    let (open_idx, delimiter) = match (line_before.rfind('['), line_before.rfind('(')) {
        (Some(square), Some(round)) if round > square => (round, Delimiter::Round),
        (Some(square), _) => (square, Delimiter::Square),
        (None, Some(round)) => (round, Delimiter::Round),
        (None, None) => return None,
    };

    if delimiter == Delimiter::Round && !line_before[..open_idx].ends_with(']') {
        return None;
    }

    let (open, close) = delimiter.pair();
    let key_before = &line_before[open_idx + open.len_utf8()..];
    let key_after = &line_after[..line_after.find(close)?];
    let raw = format!("{key_before}{key_after}");
    if raw.contains(open) || raw.contains(close) {
        return None;
    }

    let key = match delimiter {
        Delimiter::Square => raw
            .strip_suffix(":c")
            .or_else(|| raw.strip_suffix(":d"))
            .unwrap_or(&raw),
        Delimiter::Round => &raw,
    };

    let character = position.character;
    let encoding = document.encoding();
    Some(SymbolRef {
        text: key.to_string(),
        range: Range {
            start: Position {
                line: position.line,
                character: character.saturating_sub(encoding.width(key_before)),
            },
            end: Position {
                line: position.line,
                character: character + encoding.width(key_after),
            },
        },
        delimiter: Some(delimiter),
    })
}

/// Reads the value of an indented `key: value` line (optionally a `- key: value`
/// sequence entry) when the cursor is past `key: `. Comments and surrounding
/// quotes are not part of the value.
pub fn key_value_at(document: &TextDocument, position: Position, key: &str) -> Option<SymbolRef> {
    let line = document.line(position.line);
    let trimmed = line.trim_start();
    if trimmed.len() == line.len() {
        return None;
    }
    let entry = trimmed.strip_prefix("- ").unwrap_or(trimmed);
    let rest = entry.strip_prefix(key)?.strip_prefix(':')?;
    if !rest.starts_with(' ') {
        return None;
    }

    let rest_start = line.len() - rest.len();
    let encoding = document.encoding();
    if position.character <= encoding.width(&line[..rest_start]) {
        return None;
    }
    let value = match rest.find(" #") {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    let leading = value.len() - value.trim_start().len();
    let mut value = value.trim();
    let mut start = rest_start + leading;
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            value = &value[1..value.len() - 1];
            start += 1;
        }
    }
    if value.is_empty() {
        return None;
    }

    let start_char = encoding.width(&line[..start]);
    Some(SymbolRef {
        text: value.to_string(),
        range: Range {
            start: Position {
                line: position.line,
                character: start_char,
            },
            end: Position {
                line: position.line,
                character: start_char + encoding.width(value),
            },
        },
        delimiter: None,
    })
}

/// Resolves a definition key line (`  boom:`) directly under `actions` or `status`.
pub fn map_key_at(
    document: &TextDocument,
    ast: &YamlDocument,
    position: Position,
) -> Option<SymbolRef> {
    let line = document.line(position.line);
    let key = MAP_KEY_REGEX.captures(&line)?.get(1)?;
    let offset = document.offset_at(position);

    let prefix = if ast.in_section("actions", offset) && ast.action(key.as_str()).is_some() {
        Prefix::Action
    } else if ast.in_section("status", offset) && ast.status(key.as_str()).is_some() {
        Prefix::Status
    } else {
        return None;
    };

    let encoding = document.encoding();
    let start = encoding.width(&line[..key.start()]);
    Some(SymbolRef {
        text: prefix.qualify(key.as_str()),
        range: Range {
            start: Position {
                line: position.line,
                character: start,
            },
            end: Position {
                line: position.line,
                character: start + encoding.width(key.as_str()),
            },
        },
        delimiter: None,
    })
}
