//! Source locations
//!
//! Locations are 1-based line/column pairs, the way the text editor addresses
//! its buffer. Columns count characters, not bytes. Only `\n` starts a new
//! line; `\r`, U+2028 and other separators are ordinary characters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A position in the text buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextLocation {
    pub line: usize,
    pub column: usize,
}

impl TextLocation {
    pub const START: TextLocation = TextLocation { line: 1, column: 1 };

    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open range `[begin, end)` of the text buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub begin: TextLocation,
    pub end: TextLocation,
}

impl Region {
    pub fn new(begin: TextLocation, end: TextLocation) -> Self {
        Self { begin, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    pub fn contains(&self, location: TextLocation) -> bool {
        self.begin <= location && location < self.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

/// Immutable snapshot of the source text with a line table.
///
/// A parsed tree keeps the snapshot it was built from, so text between two
/// node regions can be copied even after the live buffer moved on.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: Arc<str>,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text: Arc<str> = text.into();
        let mut line_starts = vec![0];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Location of a byte offset (clamped to the end of the text)
    pub fn location(&self, offset: usize) -> TextLocation {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let column = self.text[line_start..offset].chars().count() + 1;
        TextLocation::new(line + 1, column)
    }

    /// Byte offset of a location. Columns past the end of a line resolve to
    /// the end of that line (after its newline).
    pub fn offset(&self, location: TextLocation) -> usize {
        if location.line == 0 {
            return 0;
        }
        let Some(&line_start) = self.line_starts.get(location.line - 1) else {
            return self.text.len();
        };
        let line_end = self
            .line_starts
            .get(location.line)
            .copied()
            .unwrap_or(self.text.len());

        let mut offset = line_start;
        for (count, ch) in self.text[line_start..line_end].chars().enumerate() {
            if count + 1 >= location.column {
                return offset;
            }
            offset += ch.len_utf8();
        }
        offset
    }

    /// Text between two locations; empty when `end` is not after `begin`
    pub fn slice(&self, begin: TextLocation, end: TextLocation) -> &str {
        let start = self.offset(begin);
        let stop = self.offset(end);
        if stop <= start {
            ""
        } else {
            &self.text[start..stop]
        }
    }

    pub fn region_text(&self, region: Region) -> &str {
        self.slice(region.begin, region.end)
    }
}
