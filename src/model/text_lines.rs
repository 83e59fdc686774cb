//! Line-oriented views over a snapshot
//!
//! [`TextLines`] borrows a snapshot's lazily built line index; every
//! [`TextLine`] it hands out owns a handle to the snapshot, so lines stay
//! valid after the collection that produced them is dropped.

use crate::error::{Result, TextError};
use crate::model::source_text::SourceText;
use crate::model::span::TextSpan;
use crate::primitives::line_break::{CR, LF};
use crate::primitives::line_index::LineIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based line and character offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LinePosition {
    pub line: usize,
    pub character: usize,
}

impl LinePosition {
    pub const fn new(line: usize, character: usize) -> Self {
        LinePosition { line, character }
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.character)
    }
}

/// A pair of line positions with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinePositionSpan {
    start: LinePosition,
    end: LinePosition,
}

impl LinePositionSpan {
    pub fn new(start: LinePosition, end: LinePosition) -> Result<Self> {
        if end < start {
            return Err(TextError::invalid_argument(
                "end",
                format!("{end} precedes start {start}"),
            ));
        }
        Ok(LinePositionSpan { start, end })
    }

    pub fn start(&self) -> LinePosition {
        self.start
    }

    pub fn end(&self) -> LinePosition {
        self.end
    }
}

impl fmt::Display for LinePositionSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One line of a snapshot
#[derive(Clone)]
pub struct TextLine {
    text: SourceText,
    line_number: usize,
    start: usize,
    end: usize,
    end_including_line_break: usize,
}

impl TextLine {
    /// The snapshot this line belongs to
    pub fn source_text(&self) -> &SourceText {
        &self.text
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset of the first break char, or of the line end if there is none
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn end_including_line_break(&self) -> usize {
        self.end_including_line_break
    }

    /// Chars in the terminating break: 0, 1, or 2 for CRLF
    pub fn line_break_len(&self) -> usize {
        self.end_including_line_break - self.end
    }

    pub fn span(&self) -> TextSpan {
        TextSpan::new(self.start, self.end - self.start)
    }

    pub fn span_including_line_break(&self) -> TextSpan {
        TextSpan::new(self.start, self.end_including_line_break - self.start)
    }

    /// The line's content without its break
    pub fn text(&self) -> String {
        self.text.to_string_in(self.span()).unwrap_or_default()
    }
}

impl PartialEq for TextLine {
    fn eq(&self, other: &Self) -> bool {
        self.text.ptr_eq(&other.text)
            && self.start == other.start
            && self.end_including_line_break == other.end_including_line_break
    }
}

impl Eq for TextLine {}

impl fmt::Debug for TextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLine")
            .field("line_number", &self.line_number)
            .field("span", &self.span())
            .field("line_break_len", &self.line_break_len())
            .finish()
    }
}

impl fmt::Display for TextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// The lines of a snapshot
#[derive(Clone, Copy)]
pub struct TextLines<'a> {
    text: &'a SourceText,
    index: &'a LineIndex,
}

impl<'a> TextLines<'a> {
    pub(crate) fn new(text: &'a SourceText, index: &'a LineIndex) -> Self {
        TextLines { text, index }
    }

    /// Number of lines; never zero
    pub fn count(&self) -> usize {
        self.index.line_count()
    }

    /// Line `index`, failing with `OutOfRange` past the last line
    pub fn get(&self, index: usize) -> Result<TextLine> {
        if index >= self.count() {
            return Err(TextError::out_of_range(
                "line",
                index,
                format!("0..{}", self.count()),
            ));
        }
        Ok(self.line_at(index))
    }

    fn line_at(&self, index: usize) -> TextLine {
        let start = self.index.line_start(index);
        let end_including_line_break = self.index.line_end_including_break(index);
        let break_len = if index + 1 == self.count() {
            0
        } else if end_including_line_break - start >= 2
            && matches!(self.text.char_at(end_including_line_break - 1), Ok(LF))
            && matches!(self.text.char_at(end_including_line_break - 2), Ok(CR))
        {
            2
        } else {
            1
        };
        TextLine {
            text: self.text.clone(),
            line_number: index,
            start,
            end: end_including_line_break - break_len,
            end_including_line_break,
        }
    }

    /// Index of the line containing `position`; the text end belongs to the last line
    pub fn index_of(&self, position: usize) -> Result<usize> {
        let len = self.text.len();
        if position > len {
            return Err(TextError::out_of_range(
                "position",
                position,
                format!("0..={len}"),
            ));
        }
        Ok(self.index.index_of(position))
    }

    pub fn line_from_position(&self, position: usize) -> Result<TextLine> {
        Ok(self.line_at(self.index_of(position)?))
    }

    pub fn line_position(&self, position: usize) -> Result<LinePosition> {
        let line = self.index_of(position)?;
        Ok(LinePosition::new(
            line,
            position - self.index.line_start(line),
        ))
    }

    /// Absolute offset of a line position
    pub fn position_of(&self, position: LinePosition) -> Result<usize> {
        let start = self.get(position.line)?.start();
        let offset = start.saturating_add(position.character);
        let len = self.text.len();
        if offset > len {
            return Err(TextError::out_of_range(
                "line position",
                position,
                format!("0..={len}"),
            ));
        }
        Ok(offset)
    }

    pub fn line_position_span(&self, span: TextSpan) -> Result<LinePositionSpan> {
        LinePositionSpan::new(
            self.line_position(span.start)?,
            self.line_position(span.end())?,
        )
    }

    pub fn text_span(&self, span: LinePositionSpan) -> Result<TextSpan> {
        let start = self.position_of(span.start())?;
        let end = self.position_of(span.end())?;
        TextSpan::from_bounds(start, end)
    }

    pub fn iter(&self) -> impl Iterator<Item = TextLine> + 'a {
        let lines = *self;
        (0..lines.count()).map(move |i| lines.line_at(i))
    }
}

impl fmt::Debug for TextLines<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLines")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_spans_and_breaks() {
        let text = SourceText::from_string("foo\r\nbar\nbaz\rqux\u{2028}");
        let lines = text.lines();
        assert_eq!(lines.count(), 5);

        let breaks: Vec<usize> = lines.iter().map(|l| l.line_break_len()).collect();
        assert_eq!(breaks, vec![2, 1, 1, 1, 0]);

        let contents: Vec<String> = lines.iter().map(|l| l.text()).collect();
        assert_eq!(contents, vec!["foo", "bar", "baz", "qux", ""]);

        let first = lines.get(0).unwrap();
        assert_eq!(first.span(), TextSpan::new(0, 3));
        assert_eq!(first.span_including_line_break(), TextSpan::new(0, 5));
        assert!(lines.get(5).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_line_position_round_trip() {
        let text = SourceText::from_string("goo\r\nbar");
        let lines = text.lines();
        assert_eq!(lines.line_position(6).unwrap(), LinePosition::new(1, 1));
        assert_eq!(lines.position_of(LinePosition::new(1, 1)).unwrap(), 6);
        assert_eq!(lines.line_position(8).unwrap(), LinePosition::new(1, 3));
        assert!(lines.line_position(9).unwrap_err().is_out_of_range());
        assert!(lines
            .position_of(LinePosition::new(1, 4))
            .unwrap_err()
            .is_out_of_range());
    }

    #[test]
    fn test_span_conversion() {
        let text = SourceText::from_string("one\ntwo\nthree");
        let lines = text.lines();
        let span = TextSpan::new(2, 7);
        let line_span = lines.line_position_span(span).unwrap();
        assert_eq!(line_span.start(), LinePosition::new(0, 2));
        assert_eq!(line_span.end(), LinePosition::new(2, 1));
        assert_eq!(lines.text_span(line_span).unwrap(), span);
    }

    #[test]
    fn test_line_position_span_rejects_reversed() {
        let err = LinePositionSpan::new(LinePosition::new(2, 0), LinePosition::new(1, 5)).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_lines_outlive_collection() {
        let text = SourceText::from_string("a\nb");
        let line = text.lines().get(1).unwrap();
        drop(text);
        assert_eq!(line.text(), "b");
        assert_eq!(line.to_string(), "b");
    }

    #[test]
    fn test_line_equality() {
        let text = SourceText::from_string("a\nb");
        let other = SourceText::from_string("a\nb");
        assert_eq!(text.lines().get(0).unwrap(), text.lines().get(0).unwrap());
        assert_ne!(text.lines().get(0).unwrap(), other.lines().get(0).unwrap());
    }
}
