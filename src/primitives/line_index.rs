//! Line start index
//!
//! An ordered table of line start offsets, built once and searched with
//! binary search. There is always at least one line: empty text has a
//! single zero-length line, and text ending in a break has a final empty line.

use crate::model::span::TextSpan;
use crate::model::storage::TextRead;
use crate::primitives::line_break::{LineStartScanner, CR, LF};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Scan the whole text for breaks
    pub fn build(text: &dyn TextRead) -> Self {
        let len = text.len();
        let mut scanner = LineStartScanner::new();
        text.visit_runs(TextSpan::new(0, len), &mut |run| scanner.feed(run));
        LineIndex {
            starts: scanner.finish(),
            len,
        }
    }

    /// Derive the index of `window` from its parent's index without rescanning.
    ///
    /// Parent line starts inside the window are kept; the window's own start
    /// is line 0. A window ending between the CR and LF of a parent CRLF sees
    /// a lone CR, so a final empty line is synthesized at its end.
    pub fn for_window(parent: &LineIndex, parent_text: &dyn TextRead, window: TextSpan) -> Self {
        let (start, end) = (window.start, window.end());
        let first = parent.starts.partition_point(|&p| p <= start);
        let mut starts = vec![0];
        starts.extend(
            parent.starts[first..]
                .iter()
                .take_while(|&&p| p <= end)
                .map(|&p| p - start),
        );
        if end > start
            && matches!(parent_text.char_at(end - 1), Ok(CR))
            && matches!(parent_text.char_at(end), Ok(LF))
        {
            starts.push(end - start);
        }
        LineIndex {
            starts,
            len: window.length,
        }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Length of the indexed text
    pub fn text_len(&self) -> usize {
        self.len
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// Start offset of `line`, which must be `< line_count()`
    pub fn line_start(&self, line: usize) -> usize {
        self.starts[line]
    }

    /// Offset just past the line's break (the next line's start, or the text end)
    pub fn line_end_including_break(&self, line: usize) -> usize {
        self.starts.get(line + 1).copied().unwrap_or(self.len)
    }

    /// Greatest `k` with `starts[k] <= position`
    pub fn index_of(&self, position: usize) -> usize {
        self.starts.partition_point(|&start| start <= position) - 1
    }
}
