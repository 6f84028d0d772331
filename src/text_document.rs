//! Rope-backed text documents.
//!
//! Every YAML node carries byte offsets into the source text; editors speak in
//! line/character positions. [`TextDocument`] owns the text together with a
//! [`Rope`] so both directions of the conversion stay cheap.
//!
//! The character half of a position counts code units of the encoding agreed
//! with the client at initialization: UTF-16 unless the client offers UTF-32.

use std::ops::Range as ByteRange;

use ropey::Rope;
use tower_lsp::lsp_types::{
    Position, PositionEncodingKind, Range, TextDocumentContentChangeEvent, Url,
};

use crate::yaml::NodeRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PositionEncoding {
    #[default]
    Utf16,
    Utf32,
}

impl PositionEncoding {
    /// UTF-32 when the client offers it, otherwise the protocol default.
    pub fn negotiate(offered: Option<&[PositionEncodingKind]>) -> PositionEncoding {
        match offered {
            Some(kinds) if kinds.contains(&PositionEncodingKind::UTF32) => PositionEncoding::Utf32,
            _ => PositionEncoding::Utf16,
        }
    }

    pub fn kind(self) -> PositionEncodingKind {
        match self {
            PositionEncoding::Utf16 => PositionEncodingKind::UTF16,
            PositionEncoding::Utf32 => PositionEncodingKind::UTF32,
        }
    }

    fn units(self, ch: char) -> u32 {
        match self {
            PositionEncoding::Utf16 => ch.len_utf16() as u32,
            PositionEncoding::Utf32 => 1,
        }
    }

    /// Length of `text` in code units.
    pub fn width(self, text: &str) -> u32 {
        text.chars().map(|ch| self.units(ch)).sum()
    }

    /// Byte index of `column` in `line`. Columns past the end clamp to it; a column
    /// inside a surrogate pair falls back to the start of its character.
    pub fn byte_index(self, line: &str, column: u32) -> usize {
        let mut units = 0;
        for (idx, ch) in line.char_indices() {
            let next = units + self.units(ch);
            if next > column {
                return idx;
            }
            units = next;
        }
        line.len()
    }
}

#[derive(Debug, Clone)]
pub struct TextDocument {
    uri: Url,
    version: i32,
    text: String,
    rope: Rope,
    encoding: PositionEncoding,
}

impl TextDocument {
    pub fn new(uri: Url, version: i32, text: impl Into<String>) -> TextDocument {
        let text = text.into();
        let rope = Rope::from_str(&text);
        TextDocument {
            uri,
            version,
            text,
            rope,
            encoding: PositionEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: PositionEncoding) -> TextDocument {
        self.encoding = encoding;
        self
    }

    pub fn set_encoding(&mut self, encoding: PositionEncoding) {
        self.encoding = encoding;
    }

    pub fn encoding(&self) -> PositionEncoding {
        self.encoding
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Applies editor changes in order. A change without a range replaces the whole text.
    pub fn apply_changes(&mut self, version: i32, changes: Vec<TextDocumentContentChangeEvent>) {
        for change in changes {
            match change.range {
                Some(range) => {
                    let start = self.rope.byte_to_char(self.byte_index(range.start));
                    let end = self
                        .rope
                        .byte_to_char(self.byte_index(range.end))
                        .max(start);
                    self.rope.remove(start..end);
                    self.rope.insert(start, &change.text);
                }
                None => self.rope = Rope::from_str(&change.text),
            }
        }
        self.text = self.rope.to_string();
        self.version = version;
    }

    /// Converts a byte offset into a position, clamping past-the-end offsets.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = self.clamp_byte(offset);
        let line = self.rope.byte_to_line(offset);
        let line_start = self.rope.line_to_byte(line);
        Position {
            line: line as u32,
            character: self.encoding.width(&self.text[line_start..offset]),
        }
    }

    /// Converts a position into a byte offset, clamping to the line and document ends.
    pub fn offset_at(&self, position: Position) -> usize {
        self.byte_index(position)
    }

    pub fn range_from_offsets(&self, range: ByteRange<usize>) -> Range {
        Range {
            start: self.position_at(range.start),
            end: self.position_at(range.end),
        }
    }

    /// The range of a node's own text, excluding trailing blanks and comments.
    pub fn range(&self, range: &NodeRange) -> Range {
        self.range_from_offsets(range.start..range.end)
    }

    pub fn get_text(&self, range: Range) -> &str {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        &self.text[start..end]
    }

    pub fn slice(&self, range: ByteRange<usize>) -> &str {
        let start = self.clamp_byte(range.start);
        let end = self.clamp_byte(range.end).max(start);
        self.text.get(start..end).unwrap_or_default()
    }

    /// Full text of a line without its line break.
    pub fn line(&self, line: u32) -> String {
        let line = line as usize;
        if line >= self.rope.len_lines() {
            return String::new();
        }
        self.rope
            .line(line)
            .to_string()
            .trim_end_matches(['\n', '\r'])
            .to_string()
    }

    /// Splits the cursor's line into the text before and after the cursor.
    pub fn split_line(&self, position: Position) -> (String, String) {
        let line = self.line(position.line);
        let split = self.encoding.byte_index(&line, position.character);
        (line[..split].to_string(), line[split..].to_string())
    }

    /// Zero-width range at the start of the line containing `offset`.
    pub fn line_start_range(&self, offset: usize) -> Range {
        let line = self.position_at(offset).line;
        let start = Position { line, character: 0 };
        Range { start, end: start }
    }

    /// Reads the rope only, so it stays valid between changes of one batch.
    fn byte_index(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        let line_start = self.rope.line_to_byte(line);
        line_start + self.encoding.byte_index(&self.line(position.line), position.character)
    }

    fn clamp_byte(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
