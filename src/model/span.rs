//! Spans and change descriptions
//!
//! All offsets count characters (`char`), not bytes.

use crate::error::{Result, TextError};
use std::fmt;

/// A half-open character range `[start, start + length)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl TextSpan {
    pub const fn new(start: usize, length: usize) -> Self {
        TextSpan { start, length }
    }

    /// Create a span from start and end offsets
    pub fn from_bounds(start: usize, end: usize) -> Result<Self> {
        if end < start {
            return Err(TextError::invalid_argument(
                "end",
                format!("end {end} precedes start {start}"),
            ));
        }
        Ok(TextSpan::new(start, end - start))
    }

    /// End offset, saturating at `usize::MAX`
    pub const fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    /// End offset, or `None` if it does not fit in a `usize`
    pub const fn checked_end(&self) -> Option<usize> {
        self.start.checked_add(self.length)
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True if `position` lies in `[start, end)`
    pub const fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end()
    }

    pub const fn contains_span(&self, other: TextSpan) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// True if both spans share at least one character.
    ///
    /// Spans that merely touch do not overlap, and an empty span overlaps nothing.
    pub fn overlaps_with(&self, other: TextSpan) -> bool {
        self.start.max(other.start) < self.end().min(other.end())
    }

    /// The non-empty shared region, if any
    pub fn overlap(&self, other: TextSpan) -> Option<TextSpan> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        (start < end).then(|| TextSpan::new(start, end - start))
    }

    /// True if the spans overlap or touch at an endpoint
    pub fn intersects_with(&self, other: TextSpan) -> bool {
        other.start <= self.end() && other.end() >= self.start
    }

    /// True if `position` lies in `[start, end]` (end inclusive)
    pub const fn intersects_with_position(&self, position: usize) -> bool {
        position >= self.start && position <= self.end()
    }

    /// The possibly empty shared region of two intersecting spans
    pub fn intersection(&self, other: TextSpan) -> Option<TextSpan> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        (start <= end).then(|| TextSpan::new(start, end - start))
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end())
    }
}

/// Replace the text at `span` (in the old text) with `new_text`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextChange {
    pub span: TextSpan,
    pub new_text: String,
}

impl TextChange {
    pub fn new(span: TextSpan, new_text: impl Into<String>) -> Self {
        TextChange {
            span,
            new_text: new_text.into(),
        }
    }

    /// Length in chars of the replacement text
    pub fn new_length(&self) -> usize {
        self.new_text.chars().count()
    }

    /// The summary of this change without its payload
    pub fn to_change_range(&self) -> TextChangeRange {
        TextChangeRange::new(self.span, self.new_length())
    }
}

impl fmt::Display for TextChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {:?}", self.span, self.new_text)
    }
}

/// The span of text that changed in an old text and the length of what replaced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextChangeRange {
    pub span: TextSpan,
    pub new_length: usize,
}

impl TextChangeRange {
    /// A range that represents no change at all
    pub const NO_CHANGE: TextChangeRange = TextChangeRange::new(TextSpan::new(0, 0), 0);

    pub const fn new(span: TextSpan, new_length: usize) -> Self {
        TextChangeRange { span, new_length }
    }

    /// Net length delta this range applies
    pub fn delta(&self) -> isize {
        self.new_length as isize - self.span.length as isize
    }

    /// Collapse ordered, non-overlapping ranges into one range covering them all
    pub fn collapse(ranges: &[TextChangeRange]) -> TextChangeRange {
        let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
            return TextChangeRange::NO_CHANGE;
        };
        let start = first.span.start;
        let end = last.span.end();
        let delta: isize = ranges.iter().map(TextChangeRange::delta).sum();
        let old_length = end - start;
        let new_length = (old_length as isize + delta).max(0) as usize;
        TextChangeRange::new(TextSpan::new(start, old_length), new_length)
    }
}

impl fmt::Display for TextChangeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} chars", self.span, self.new_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bounds() {
        assert_eq!(TextSpan::from_bounds(3, 7).unwrap(), TextSpan::new(3, 4));
        assert_eq!(TextSpan::from_bounds(3, 3).unwrap(), TextSpan::new(3, 0));
        assert!(TextSpan::from_bounds(7, 3).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_contains() {
        let span = TextSpan::new(2, 3);
        assert!(!span.contains(1));
        assert!(span.contains(2));
        assert!(span.contains(4));
        assert!(!span.contains(5));
        assert!(!TextSpan::new(2, 0).contains(2));
        assert!(span.contains_span(TextSpan::new(3, 2)));
        assert!(!span.contains_span(TextSpan::new(3, 3)));
    }

    #[test]
    fn test_overlap_vs_intersection() {
        let a = TextSpan::new(0, 5);
        let b = TextSpan::new(5, 5);
        // touching spans intersect but do not overlap
        assert!(!a.overlaps_with(b));
        assert_eq!(a.overlap(b), None);
        assert!(a.intersects_with(b));
        assert_eq!(a.intersection(b), Some(TextSpan::new(5, 0)));

        let c = TextSpan::new(3, 5);
        assert!(a.overlaps_with(c));
        assert_eq!(a.overlap(c), Some(TextSpan::new(3, 2)));
        assert_eq!(a.intersection(c), Some(TextSpan::new(3, 2)));

        let far = TextSpan::new(10, 2);
        assert!(!a.intersects_with(far));
        assert_eq!(a.intersection(far), None);
    }

    #[test]
    fn test_empty_span_overlaps_nothing() {
        let empty = TextSpan::new(2, 0);
        assert!(!empty.overlaps_with(TextSpan::new(0, 5)));
        assert!(empty.intersects_with(TextSpan::new(0, 5)));
        assert!(empty.intersects_with_position(2));
    }

    #[test]
    fn test_end_of_huge_span() {
        let span = TextSpan::new(usize::MAX, 2);
        assert_eq!(span.checked_end(), None);
        assert_eq!(span.end(), usize::MAX);
        assert_eq!(TextSpan::new(3, 4).checked_end(), Some(7));
        assert!(!span.contains(0));
    }

    #[test]
    fn test_collapse() {
        let ranges = [
            TextChangeRange::new(TextSpan::new(2, 3), 1),
            TextChangeRange::new(TextSpan::new(8, 0), 4),
        ];
        let collapsed = TextChangeRange::collapse(&ranges);
        assert_eq!(collapsed.span, TextSpan::new(2, 6));
        assert_eq!(collapsed.new_length, 8);
        assert_eq!(TextChangeRange::collapse(&[]), TextChangeRange::NO_CHANGE);
    }

    #[test]
    fn test_change_range_from_change() {
        let change = TextChange::new(TextSpan::new(6, 0), "Beautiful ");
        assert_eq!(
            change.to_change_range(),
            TextChangeRange::new(TextSpan::new(6, 0), 10)
        );
    }
}
