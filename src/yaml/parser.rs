use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use ropey::Rope;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, ScanError, TScalarStyle};

use super::node::{Node, NodeKind, NodeRange, Pair, Scalar};

static FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").unwrap()
});

/// Parses the first document of `text` into a node tree carrying byte ranges.
pub(super) fn parse(text: &str) -> Result<Option<Node>, ScanError> {
    let mut builder = TreeBuilder::new(text);
    let mut parser = Parser::new_from_str(text);
    parser.load(&mut builder, false)?;
    Ok(builder.root)
}

enum Frame {
    Map {
        start: usize,
        flow: bool,
        anchor: usize,
        pairs: Vec<Pair>,
        key: Option<Node>,
    },
    Seq {
        start: usize,
        flow: bool,
        anchor: usize,
        items: Vec<Node>,
    },
}

struct TreeBuilder<'a> {
    text: &'a str,
    rope: Rope,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Node>,
    root: Option<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn new(text: &'a str) -> Self {
        TreeBuilder {
            text,
            rope: Rope::from_str(text),
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
        }
    }

    /// Markers count characters; node ranges count bytes.
    fn offset(&self, mark: &Marker) -> usize {
        let index = mark.index().min(self.rope.len_chars());
        self.rope.char_to_byte(index)
    }

    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Map { pairs, key, .. }) => match key.take() {
                None => *key = Some(node),
                Some(key) => pairs.push(Pair { key, value: node }),
            },
            Some(Frame::Seq { items, .. }) => items.push(node),
        }
    }

    fn remember(&mut self, anchor: usize, node: &Node) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
    }

    fn scalar(&self, value: String, style: TScalarStyle, start: usize) -> Node {
        let bytes = self.text.as_bytes();
        let is_empty_null = matches!(style, TScalarStyle::Plain)
            && value == "~"
            && !self.text[start..].starts_with('~');

        let (start, end) = if is_empty_null {
            let position = self.empty_value_position(start);
            (position, position)
        } else {
            let end = match style {
                TScalarStyle::Plain => self.plain_end(start, &value),
                TScalarStyle::SingleQuoted => quoted_end(bytes, start, b'\''),
                TScalarStyle::DoubleQuoted => quoted_end(bytes, start, b'"'),
                _ if matches!(bytes.get(start), Some(b'|') | Some(b'>')) => self.block_end(start),
                _ => self.plain_end(start, &value),
            };
            (start, end)
        };

        let resolved = match style {
            TScalarStyle::Plain if is_empty_null => Scalar::Null,
            TScalarStyle::Plain => resolve_plain(&value),
            _ => Scalar::Str(value.clone()),
        };

        Node {
            range: NodeRange {
                start,
                end,
                end2: self.trailing(end),
            },
            kind: NodeKind::Scalar {
                raw: value,
                value: resolved,
            },
        }
    }

    /// An omitted value sits right after its key's colon.
    fn empty_value_position(&self, mark_offset: usize) -> usize {
        match self.stack.last() {
            Some(Frame::Map { key: Some(key), .. }) => {
                let end = key.range.end;
                match self.text[end..].starts_with(':') {
                    true => end + 1,
                    false => end,
                }
            }
            _ => mark_offset,
        }
    }

    fn plain_end(&self, start: usize, value: &str) -> usize {
        let rest = &self.text[start..];
        if rest.starts_with(value) {
            return start + value.len();
        }
        // Folded multi-line scalar: follow its words through the source.
        let mut cursor = start;
        for word in value.split_whitespace() {
            match self.text[cursor..].find(word) {
                Some(idx) => cursor += idx + word.len(),
                None => break,
            }
        }
        cursor
    }

    fn block_end(&self, start: usize) -> usize {
        let text = self.text;
        let line_start = text[..start].rfind('\n').map_or(0, |idx| idx + 1);
        let parent_indent = text[line_start..]
            .bytes()
            .take_while(|byte| *byte == b' ')
            .count();

        let Some(header_len) = text[start..].find('\n') else {
            return text.len();
        };
        let mut end = start + header_len;
        let mut pos = end + 1;
        let mut indent: Option<usize> = None;

        while pos < text.len() {
            let stop = text[pos..].find('\n').map_or(text.len(), |idx| pos + idx);
            let line = &text[pos..stop];
            let content = line.trim_start_matches(' ');
            if content.trim().is_empty() {
                pos = stop + 1;
                continue;
            }
            let spaces = line.len() - content.len();
            let required = *indent.get_or_insert(spaces);
            if spaces <= parent_indent || spaces < required {
                break;
            }
            end = pos + line.trim_end().len();
            pos = stop + 1;
        }
        end
    }

    fn alias_end(&self, start: usize) -> usize {
        let rest = &self.text[start..];
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, ',' | ']' | '}'))
            .unwrap_or(rest.len());
        start + len
    }

    fn trailing(&self, end: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut pos = end;
        while matches!(bytes.get(pos), Some(b' ') | Some(b'\t')) {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'#') {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
        }
        if bytes.get(pos) == Some(&b'\r') {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'\n') {
            pos += 1;
        }
        pos
    }

    fn close(&mut self, end_offset: usize) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let bytes = self.text.as_bytes();

        let (start, flow, anchor, kind, last) = match frame {
            Frame::Map {
                start,
                flow,
                anchor,
                pairs,
                ..
            } => {
                let last = pairs.last().map(|pair| pair.value.range);
                (start, flow, anchor, NodeKind::Map(pairs), last)
            }
            Frame::Seq {
                start,
                flow,
                anchor,
                items,
            } => {
                let last = items.last().map(|item| item.range);
                (start, flow, anchor, NodeKind::Seq(items), last)
            }
        };

        let range = match (flow, last) {
            (true, _) if matches!(bytes.get(end_offset), Some(b'}') | Some(b']')) => {
                let end = end_offset + 1;
                NodeRange {
                    start,
                    end,
                    end2: self.trailing(end),
                }
            }
            (_, Some(last)) => NodeRange {
                start,
                end: last.end,
                end2: last.end2,
            },
            (_, None) => NodeRange {
                start,
                end: start,
                end2: self.trailing(start),
            },
        };

        let node = Node { range, kind };
        self.remember(anchor, &node);
        self.push(node);
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        let offset = self.offset(&mark);
        match ev {
            Event::Scalar(value, style, anchor, ..) => {
                let node = self.scalar(value, style, offset);
                self.remember(anchor, &node);
                self.push(node);
            }
            Event::Alias(anchor) => {
                let end = self.alias_end(offset);
                let range = NodeRange {
                    start: offset,
                    end,
                    end2: self.trailing(end),
                };
                let node = match self.anchors.get(&anchor) {
                    Some(target) => Node {
                        range,
                        kind: target.kind.clone(),
                    },
                    None => Node {
                        range,
                        kind: NodeKind::Scalar {
                            raw: String::new(),
                            value: Scalar::Null,
                        },
                    },
                };
                self.push(node);
            }
            Event::MappingStart(anchor, ..) => self.stack.push(Frame::Map {
                start: offset,
                flow: self.text[offset..].starts_with('{'),
                anchor,
                pairs: Vec::new(),
                key: None,
            }),
            Event::SequenceStart(anchor, ..) => self.stack.push(Frame::Seq {
                start: offset,
                flow: self.text[offset..].starts_with('['),
                anchor,
                items: Vec::new(),
            }),
            Event::MappingEnd | Event::SequenceEnd => self.close(offset),
            _ => {}
        }
    }
}

fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if quote == b'"' => pos += 2,
            byte if byte == quote => {
                if quote == b'\'' && bytes.get(pos + 1) == Some(&b'\'') {
                    pos += 2;
                    continue;
                }
                return pos + 1;
            }
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn resolve_plain(raw: &str) -> Scalar {
    match raw {
        "" | "~" | "null" | "Null" | "NULL" => Scalar::Null,
        "true" | "True" | "TRUE" => Scalar::Bool(true),
        "false" | "False" | "FALSE" => Scalar::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Scalar::Float(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Scalar::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Scalar::Float(f64::NAN),
        _ => resolve_number(raw).unwrap_or_else(|| Scalar::Str(raw.to_string())),
    }
}

fn resolve_number(raw: &str) -> Option<Scalar> {
    if let Some(hex) = raw.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok().map(Scalar::Int);
    }
    if let Some(octal) = raw.strip_prefix("0o") {
        return i64::from_str_radix(octal, 8).ok().map(Scalar::Int);
    }
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return match raw.parse::<i64>() {
            Ok(value) => Some(Scalar::Int(value)),
            Err(_) => raw.parse::<f64>().ok().map(Scalar::Float),
        };
    }
    if FLOAT_REGEX.is_match(raw) {
        return raw.parse::<f64>().ok().map(Scalar::Float);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(text: &str) -> Node {
        parse(text).unwrap().expect("document should have contents")
    }

    /// Test: scalar ranges cover exactly their own text; end2 extends over comment and newline
    #[test]
    fn test_scalar_ranges() {
        let text = "id: 1234 # note\nboss: \"Zodiark\"\n";
        let node = root(text);

        let id = node.get("id").unwrap();
        assert_eq!(&text[id.range.start..id.range.end], "1234");
        assert_eq!(id.range.end2, text.find("boss").unwrap());
        assert_eq!(id.as_scalar(), Some(&Scalar::Int(1234)));

        let boss = node.get("boss").unwrap();
        assert_eq!(&text[boss.range.start..boss.range.end], "\"Zodiark\"");
        assert_eq!(boss.as_str(), Some("Zodiark"));
    }

    #[test]
    fn test_core_schema_resolution() {
        let node = root("a: true\nb: 1.5\nc: '12'\nd: ~\ne: hello\nf: -3\n");
        assert_eq!(node.get("a").unwrap().as_bool(), Some(true));
        assert_eq!(node.get("b").unwrap().as_f64(), Some(1.5));
        assert_eq!(node.get("c").unwrap().as_str(), Some("12"), "Quoted scalars stay strings");
        assert!(node.get("d").unwrap().is_null());
        assert_eq!(node.get("e").unwrap().as_str(), Some("hello"));
        assert_eq!(node.get("f").unwrap().as_f64(), Some(-3.0));
    }

    /// Test: a block map's range spans from its first key through its last line
    #[test]
    fn test_nested_map_ranges() {
        let text = "actions:\n  boom:\n    mechanic: aoe\n    damage: 50000\nboss: x\n";
        let node = root(text);
        let boom = node.get("actions").unwrap().get("boom").unwrap();
        assert_eq!(boom.range.start, text.find("mechanic").unwrap());
        assert_eq!(&text[boom.range.end - 5..boom.range.end], "50000");
        assert_eq!(boom.range.end2, text.find("boss").unwrap());
    }

    #[test]
    fn test_flow_collection_ranges() {
        let text = "position: [10, 20, 5]\n";
        let node = root(text);
        let position = node.get("position").unwrap();
        assert_eq!(&text[position.range.start..position.range.end], "[10, 20, 5]");
        assert_eq!(position.as_seq().unwrap().len(), 3);
    }

    /// Test: an omitted value becomes a null placed right after the colon
    #[test]
    fn test_empty_value() {
        let text = "wip:\nboss: x\n";
        let node = root(text);
        let wip = node.get("wip").unwrap();
        assert!(wip.is_null());
        assert_eq!(wip.range.start, 4);
    }

    #[test]
    fn test_block_scalar_range() {
        let text = "description: |\n  line one\n  line two\nboss: x\n";
        let node = root(text);
        let description = node.get("description").unwrap();
        assert_eq!(description.as_str(), Some("line one\nline two\n"));
        assert!(text[description.range.start..description.range.end].ends_with("line two"));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse("key: [unclosed\nother: {").is_err());
    }
}
