//! Edit history between snapshots
//!
//! Each edited snapshot records the ranges that produced it and a weak link
//! to the snapshot it was edited from. Links are weak so a snapshot never
//! keeps its ancestors alive; once an ancestor is gone, the ranges leading
//! to it are only kept while some older ancestor is still reachable.

use crate::error::{Result, TextError};
use crate::model::source_text::SourceTextInner;
use crate::model::span::{TextChange, TextChangeRange, TextSpan};
use crate::model::storage::TextRead;
use std::sync::{Arc, Weak};

pub(crate) struct ChangeInfo {
    pub ranges: Arc<[TextChangeRange]>,
    pub old: Weak<SourceTextInner>,
    pub previous: Option<Arc<ChangeInfo>>,
}

impl ChangeInfo {
    pub fn new(
        ranges: Arc<[TextChangeRange]>,
        old: Weak<SourceTextInner>,
        previous: Option<Arc<ChangeInfo>>,
    ) -> Self {
        ChangeInfo {
            ranges,
            old,
            previous: Self::trimmed(previous),
        }
    }

    /// True if this step was applied to `old`
    pub fn is_from(&self, old: &Arc<SourceTextInner>) -> bool {
        // the weak link keeps the allocation reserved, so the address cannot be reused
        std::ptr::eq(self.old.as_ptr(), Arc::as_ptr(old))
    }

    /// Drop the tail of a chain past its oldest still-alive ancestor
    fn trimmed(head: Option<Arc<ChangeInfo>>) -> Option<Arc<ChangeInfo>> {
        let mut chain = Vec::new();
        let mut current = head.clone();
        while let Some(info) = current {
            current = info.previous.clone();
            chain.push(info);
        }

        let last_alive = chain.iter().rposition(|info| info.old.strong_count() > 0)?;
        if last_alive + 1 == chain.len() {
            return head;
        }

        let mut rebuilt = None;
        for info in chain[..=last_alive].iter().rev() {
            rebuilt = Some(Arc::new(ChangeInfo {
                ranges: info.ranges.clone(),
                old: info.old.clone(),
                previous: rebuilt,
            }));
        }
        rebuilt
    }

    /// Number of recorded steps, this one included
    #[cfg(test)]
    pub fn depth(&self) -> usize {
        1 + self.previous.as_ref().map_or(0, |p| p.depth())
    }
}

/// Check that changes are ascending, non-overlapping and inside a text of `len` chars.
///
/// Insertions may share a position with the following change; the list is
/// never reordered.
pub(crate) fn validate_changes(changes: &[TextChange], len: usize) -> Result<()> {
    let mut previous_end = 0;
    for (i, change) in changes.iter().enumerate() {
        if change.span.checked_end().is_none_or(|end| end > len) {
            return Err(TextError::out_of_range(
                "change span",
                change.span,
                format!("[0..{len})"),
            ));
        }
        if i > 0 && change.span.start < previous_end {
            return Err(TextError::invalid_argument(
                "changes",
                format!(
                    "change {} at {} overlaps or precedes the previous change ending at {}",
                    i, change.span, previous_end
                ),
            ));
        }
        previous_end = change.span.end();
    }
    Ok(())
}

struct Interval {
    start: usize,
    end: usize,
    first_delta: isize,
    second_delta: isize,
}

/// Compose `first` (old → mid) with `second` (mid → new) into ranges old → new.
///
/// Works in mid coordinates: every range of either list becomes an interval
/// there, overlapping or touching intervals are grouped, and each group maps
/// back to one old-text range.
pub(crate) fn compose(first: &[TextChangeRange], second: &[TextChangeRange]) -> Vec<TextChangeRange> {
    if first.is_empty() {
        return second.to_vec();
    }
    if second.is_empty() {
        return first.to_vec();
    }

    let mut intervals = Vec::with_capacity(first.len() + second.len());
    let mut shift = 0isize;
    for range in first {
        let start = range.span.start.saturating_add_signed(shift);
        intervals.push(Interval {
            start,
            end: start + range.new_length,
            first_delta: range.delta(),
            second_delta: 0,
        });
        shift += range.delta();
    }
    for range in second {
        intervals.push(Interval {
            start: range.span.start,
            end: range.span.end(),
            first_delta: 0,
            second_delta: range.delta(),
        });
    }
    intervals.sort_by_key(|interval| (interval.start, interval.end));

    let mut result = Vec::new();
    let mut delta_before = 0isize;
    let mut iter = intervals.into_iter().peekable();
    while let Some(head) = iter.next() {
        let group_start = head.start;
        let mut group_end = head.end;
        let mut first_delta = head.first_delta;
        let mut second_delta = head.second_delta;
        while let Some(next) = iter.next_if(|next| next.start <= group_end) {
            group_end = group_end.max(next.end);
            first_delta += next.first_delta;
            second_delta += next.second_delta;
        }

        let old_start = group_start as isize - delta_before;
        let old_end = group_end as isize - delta_before - first_delta;
        let new_length = (group_end - group_start) as isize + second_delta;
        result.push(TextChangeRange::new(
            TextSpan::new(old_start as usize, (old_end - old_start) as usize),
            new_length as usize,
        ));
        delta_before += first_delta;
    }
    result
}

/// Minimal single-range difference: trim the common prefix and suffix
pub(crate) fn diff_common_affixes(old: &dyn TextRead, new: &dyn TextRead) -> Vec<TextChangeRange> {
    let (old_len, new_len) = (old.len(), new.len());
    let shorter = old_len.min(new_len);

    let mut prefix = 0;
    while prefix < shorter && old.char_at(prefix).ok() == new.char_at(prefix).ok() {
        prefix += 1;
    }
    if prefix == old_len && prefix == new_len {
        return Vec::new();
    }

    let mut suffix = 0;
    while suffix < shorter - prefix
        && old.char_at(old_len - 1 - suffix).ok() == new.char_at(new_len - 1 - suffix).ok()
    {
        suffix += 1;
    }

    vec![TextChangeRange::new(
        TextSpan::new(prefix, old_len - prefix - suffix),
        new_len - prefix - suffix,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::flat_text::FlatText;

    fn range(start: usize, length: usize, new_length: usize) -> TextChangeRange {
        TextChangeRange::new(TextSpan::new(start, length), new_length)
    }

    /// Apply ranges to `text`, taking replacement text from `new_text`
    fn apply(old: &str, ranges: &[TextChangeRange], new: &str) -> String {
        let old: Vec<char> = old.chars().collect();
        let new: Vec<char> = new.chars().collect();
        let mut out = String::new();
        let mut position = 0;
        let mut delta = 0isize;
        for r in ranges {
            out.extend(&old[position..r.span.start]);
            let new_start = r.span.start.saturating_add_signed(delta);
            out.extend(&new[new_start..new_start + r.new_length]);
            position = r.span.end();
            delta += r.delta();
        }
        out.extend(&old[position..]);
        out
    }

    #[test]
    fn test_validate_accepts_touching_changes() {
        let changes = [
            TextChange::new(TextSpan::new(0, 0), "a"),
            TextChange::new(TextSpan::new(0, 3), "b"),
            TextChange::new(TextSpan::new(3, 0), "c"),
            TextChange::new(TextSpan::new(3, 0), "d"),
        ];
        assert!(validate_changes(&changes, 5).is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_and_descending() {
        let overlapping = [
            TextChange::new(TextSpan::new(0, 5), "Halo"),
            TextChange::new(TextSpan::new(3, 5), "Universe"),
        ];
        assert!(validate_changes(&overlapping, 11)
            .unwrap_err()
            .is_invalid_argument());

        let descending = [
            TextChange::new(TextSpan::new(3, 5), "Universe"),
            TextChange::new(TextSpan::new(0, 2), "Ha"),
        ];
        assert!(validate_changes(&descending, 11)
            .unwrap_err()
            .is_invalid_argument());

        let past_end = [TextChange::new(TextSpan::new(9, 5), "x")];
        assert!(validate_changes(&past_end, 11).unwrap_err().is_out_of_range());

        let overflowing = [TextChange::new(TextSpan::new(usize::MAX, 2), "x")];
        assert!(validate_changes(&overflowing, 11).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_compose_disjoint() {
        // "Hello World" -> "Hello Beautiful World" -> "Halo Beautiful World"
        let first = [range(6, 0, 10)];
        let second = [range(0, 5, 4)];
        assert_eq!(compose(&first, &second), vec![range(0, 5, 4), range(6, 0, 10)]);
    }

    #[test]
    fn test_compose_edit_inside_inserted_text() {
        // "abc" -> "abXYZc" -> "abXQZc"
        let first = [range(2, 0, 3)];
        let second = [range(3, 1, 1)];
        let composed = compose(&first, &second);
        assert_eq!(composed, vec![range(2, 0, 3)]);
        assert_eq!(apply("abc", &composed, "abXQZc"), "abXQZc");
    }

    #[test]
    fn test_compose_deletion_then_insertion_at_same_point() {
        // "abcdef" -> "abf" -> "abZf"
        let first = [range(2, 3, 0)];
        let second = [range(2, 0, 1)];
        let composed = compose(&first, &second);
        assert_eq!(composed, vec![range(2, 3, 1)]);
        assert_eq!(apply("abcdef", &composed, "abZf"), "abZf");
    }

    #[test]
    fn test_compose_shifted_positions() {
        // "0123456789" -> "0123456789" with "AA" inserted at 2 -> delete "78" (mid 9..11)
        let first = [range(2, 0, 2)];
        let second = [range(9, 2, 0)];
        let composed = compose(&first, &second);
        assert_eq!(composed, vec![range(2, 0, 2), range(7, 2, 0)]);
        assert_eq!(apply("0123456789", &composed, "01AA234569"), "01AA234569");
    }

    #[test]
    fn test_diff_common_affixes() {
        let old = FlatText::from_text("Hello World");
        let new = FlatText::from_text("Hello Beautiful World");
        assert_eq!(diff_common_affixes(&old, &new), vec![range(6, 0, 10)]);

        let same = FlatText::from_text("Hello World");
        assert!(diff_common_affixes(&old, &same).is_empty());

        let shorter = FlatText::from_text("Hello");
        assert_eq!(diff_common_affixes(&old, &shorter), vec![range(5, 6, 0)]);

        let aaa = FlatText::from_text("aaa");
        let aa = FlatText::from_text("aa");
        assert_eq!(diff_common_affixes(&aaa, &aa), vec![range(2, 1, 0)]);
    }
}
