//! Graphing element keys.
//!
//! Diagram steps address elements through compound keys. [`resolve_key`] expands a
//! key into the element ids it stands for.
//!
//! | Key | Elements |
//! |-----|----------|
//! | `e` | `e` |
//! | `e#1..3` | `e#1`, `e#2`, `e#3` |
//! | `e#[1,2]_[a,b]` | `e#1_a`, `e#1_b`, `e#2_a`, `e#2_b` |
//! | `e#x*` | first-step ids starting with `e#x` |
//! | `[a, b]` | `a`, `b` (no definition) |
//! | `tanks` | `T1`, `T2` |

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const SPECIAL_ELEMENT_KEYS: [&str; 26] = [
    "players", "DPS", "tanks", "healers", "supports", "T1", "T2", "H1", "H2", "M1", "M2", "R1",
    "R2", "boss", "arena", "enemy", "cast", "tower", "marker-a", "marker-1", "marker-b",
    "marker-2", "marker-c", "marker-3", "marker-d", "marker-4",
];

const MAX_EXPANSION: usize = 1000;

static KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^#]+)(?:#(?:(\d+)\.\.(\d+)|(.+)))?").unwrap());
static BRACKET_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());
static RANGE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\.\.(\d+)\s*$").unwrap());

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphingKeyError {
    #[error("\"{0}\" is not a valid diagram key.")]
    InvalidKey(String),
    #[error("Invalid range {from}..{to}: end must be greater than start.")]
    InvalidRange { from: String, to: String },
    #[error("Range {from}..{to} expands to more than 1000 elements.")]
    RangeTooLarge { from: String, to: String },
    #[error("Only a single wildcard is permitted in \"{0}\".")]
    MultipleWildcards(String),
    #[error("Unbalanced bracket expression in \"{0}\".")]
    UnbalancedBrackets(String),
    #[error("Bracket expression [{0}] contains an empty value.")]
    EmptyBracketValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// Element type the key instantiates; `None` for literal lists.
    pub definition: Option<String>,
    pub elements: Vec<String>,
    pub wildcard: bool,
}

impl ResolvedKey {
    fn single(definition: &str, elements: Vec<String>) -> ResolvedKey {
        ResolvedKey {
            definition: Some(definition.to_string()),
            elements,
            wildcard: false,
        }
    }
}

pub fn is_special(key: &str) -> bool {
    SPECIAL_ELEMENT_KEYS.contains(&key)
}

/// Seats a special key stands for.
pub fn unwrap_special(key: &str) -> Vec<String> {
    let seats: &[&str] = match key {
        "players" => &["T1", "T2", "H1", "H2", "M1", "M2", "R1", "R2"],
        "DPS" => &["M1", "M2", "R1", "R2"],
        "tanks" => &["T1", "T2"],
        "healers" => &["H1", "H2"],
        "supports" => &["T1", "T2", "H1", "H2"],
        other => return vec![other.to_string()],
    };
    seats.iter().map(|seat| seat.to_string()).collect()
}

/// Expands a diagram key. `first_step` holds the element ids created in the first
/// step of the graph, which wildcards match against.
pub fn resolve_key(key: &str, first_step: &BTreeSet<String>) -> Result<ResolvedKey, GraphingKeyError> {
    if is_special(key) {
        return Ok(ResolvedKey::single(key, unwrap_special(key)));
    }

    let captures = KEY_REGEX
        .captures(key)
        .filter(|captures| captures.get(0).is_some_and(|it| it.len() == key.len()))
        .ok_or_else(|| GraphingKeyError::InvalidKey(key.to_string()))?;
    let base = captures.get(1).map_or("", |it| it.as_str());

    if let (Some(from), Some(to)) = (captures.get(2), captures.get(3)) {
        let elements = expand_range(from.as_str(), to.as_str())?
            .map(|number| format!("{base}#{number}"))
            .collect();
        return Ok(ResolvedKey::single(base, elements));
    }

    if let Some(subkey) = captures.get(4).map(|it| it.as_str()) {
        if subkey.contains('*') {
            return resolve_wildcard(key, base, subkey, first_step);
        }
        return Ok(ResolvedKey::single(base, expand_brackets(key, base, subkey)?));
    }

    let (definition, list) = match base.strip_prefix('[').and_then(|it| it.strip_suffix(']')) {
        Some(inner) => (None, inner),
        None if base.contains(',') => (None, base),
        None => (Some(base.to_string()), base),
    };
    Ok(ResolvedKey {
        definition,
        elements: list.split(',').map(|it| it.trim().to_string()).collect(),
        wildcard: false,
    })
}

fn expand_range(from: &str, to: &str) -> Result<std::ops::RangeInclusive<u64>, GraphingKeyError> {
    let invalid = || GraphingKeyError::InvalidRange {
        from: from.to_string(),
        to: to.to_string(),
    };
    let start = from.parse::<u64>().map_err(|_| invalid())?;
    let end = to.parse::<u64>().map_err(|_| invalid())?;
    if start >= end {
        return Err(invalid());
    }
    if end - start >= MAX_EXPANSION as u64 {
        return Err(GraphingKeyError::RangeTooLarge {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(start..=end)
}

fn resolve_wildcard(
    key: &str,
    base: &str,
    subkey: &str,
    first_step: &BTreeSet<String>,
) -> Result<ResolvedKey, GraphingKeyError> {
    let Some((left, right)) = subkey.split_once('*') else {
        return Err(GraphingKeyError::InvalidKey(key.to_string()));
    };
    if right.contains('*') {
        return Err(GraphingKeyError::MultipleWildcards(key.to_string()));
    }
    let left = format!("{base}#{left}");
    let elements = first_step
        .iter()
        .filter(|element| {
            element.len() >= left.len() + right.len()
                && element.starts_with(&left)
                && element.ends_with(right)
        })
        .cloned()
        .collect();
    Ok(ResolvedKey {
        definition: Some(base.to_string()),
        elements,
        wildcard: true,
    })
}

/// Cartesian product of all bracket groups; the first group varies slowest.
fn expand_brackets(key: &str, base: &str, subkey: &str) -> Result<Vec<String>, GraphingKeyError> {
    let mut strings = vec![format!("{base}#")];
    let mut last = 0;

    for captures in BRACKET_REGEX.captures_iter(subkey) {
        let (Some(group), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let literal = literal_segment(key, &subkey[last..group.start()])?;
        let values = bracket_values(inner.as_str())?;
        strings = strings
            .iter()
            .flat_map(|prefix| values.iter().map(move |value| format!("{prefix}{literal}{value}")))
            .collect();
        last = group.end();
    }

    let suffix = literal_segment(key, &subkey[last..])?;
    Ok(strings.into_iter().map(|it| format!("{it}{suffix}")).collect())
}

fn literal_segment<'a>(key: &str, segment: &'a str) -> Result<&'a str, GraphingKeyError> {
    if segment.contains("[]") {
        return Err(GraphingKeyError::EmptyBracketValue(String::new()));
    }
    match segment.contains(['[', ']']) {
        true => Err(GraphingKeyError::UnbalancedBrackets(key.to_string())),
        false => Ok(segment),
    }
}

fn bracket_values(inner: &str) -> Result<Vec<String>, GraphingKeyError> {
    if let Some(captures) = RANGE_REGEX.captures(inner) {
        let (from, to) = (&captures[1], &captures[2]);
        return Ok(expand_range(from, to)?.map(|it| it.to_string()).collect());
    }
    let values: Vec<String> = inner.split(',').map(|it| it.trim().to_string()).collect();
    if values.iter().any(String::is_empty) {
        return Err(GraphingKeyError::EmptyBracketValue(inner.to_string()));
    }
    Ok(values)
}
