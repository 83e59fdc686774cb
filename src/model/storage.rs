//! Storage strategies behind a text snapshot
//!
//! Every variant implements the same minimal read contract ([`TextRead`]).
//! Storages are immutable once built, so cloning one only bumps reference
//! counts and the clones can be shared freely across threads and snapshots.

use crate::error::{Result, TextError};
use crate::model::chunked_text::ChunkedText;
use crate::model::composite_text::CompositeText;
use crate::model::flat_text::FlatText;
use crate::model::span::TextSpan;
use crate::model::sub_text::SubText;

/// The read contract shared by all storage variants
pub trait TextRead {
    /// Number of chars
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The char at `position`, failing with `OutOfRange` past the end
    fn char_at(&self, position: usize) -> Result<char>;

    /// Copy `count` chars starting at `source_index` into `dest[dest_index..]`
    fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()>;

    /// Visit the chars of `span` as contiguous runs, in order.
    ///
    /// `span` must already be validated against `len()`.
    fn visit_runs(&self, span: TextSpan, visitor: &mut dyn FnMut(&[char]));

    /// The chars of `span` as a `String`
    fn to_string_span(&self, span: TextSpan) -> Result<String> {
        check_span(self.len(), span)?;
        let mut out = String::with_capacity(span.length);
        self.visit_runs(span, &mut |run| out.extend(run.iter()));
        Ok(out)
    }
}

pub(crate) fn check_position(len: usize, position: usize) -> Result<()> {
    if position >= len {
        return Err(TextError::out_of_range("position", position, format!("0..{len}")));
    }
    Ok(())
}

pub(crate) fn check_span(len: usize, span: TextSpan) -> Result<()> {
    if span.checked_end().is_none_or(|end| end > len) {
        return Err(TextError::out_of_range("span", span, format!("[0..{len})")));
    }
    Ok(())
}

pub(crate) fn check_copy(
    len: usize,
    source_index: usize,
    dest_len: usize,
    dest_index: usize,
    count: usize,
) -> Result<()> {
    if source_index.checked_add(count).is_none_or(|end| end > len) {
        return Err(TextError::out_of_range(
            "source range",
            format!("{source_index}+{count}"),
            format!("0..={len}"),
        ));
    }
    if dest_index.checked_add(count).is_none_or(|end| end > dest_len) {
        return Err(TextError::out_of_range(
            "destination range",
            format!("{dest_index}+{count}"),
            format!("0..={dest_len}"),
        ));
    }
    Ok(())
}

/// One of the four interchangeable storage strategies
#[derive(Debug, Clone)]
pub enum Storage {
    /// One contiguous block
    Flat(FlatText),
    /// Fixed-capacity chunks, for large decoded inputs
    Chunked(ChunkedText),
    /// Concatenation of child storages, produced by edits
    Composite(CompositeText),
    /// A window over a flat or chunked parent
    Sub(SubText),
}

impl Storage {
    pub fn empty() -> Storage {
        Storage::Flat(FlatText::empty())
    }

    /// True if both values refer to the same underlying allocation
    pub fn same_as(&self, other: &Storage) -> bool {
        match (self, other) {
            (Storage::Flat(a), Storage::Flat(b)) => a.same_as(b),
            (Storage::Chunked(a), Storage::Chunked(b)) => a.same_as(b),
            (Storage::Composite(a), Storage::Composite(b)) => a.same_as(b),
            (Storage::Sub(a), Storage::Sub(b)) => {
                a.parent().same_as(b.parent()) && a.span() == b.span()
            }
            _ => false,
        }
    }

    /// A storage holding exactly the chars of `span`, sharing this one's data.
    ///
    /// Views never nest: slicing a view re-targets its parent, and slicing a
    /// composite slices its children.
    pub fn slice(&self, span: TextSpan) -> Result<Storage> {
        check_span(self.len(), span)?;
        if span.start == 0 && span.length == self.len() {
            return Ok(self.clone());
        }
        if span.is_empty() {
            return Ok(Storage::empty());
        }
        Ok(match self {
            Storage::Flat(_) | Storage::Chunked(_) => {
                Storage::Sub(SubText::new(self.clone(), span))
            }
            Storage::Sub(sub) => Storage::Sub(SubText::new(
                sub.parent().clone(),
                TextSpan::new(sub.span().start + span.start, span.length),
            )),
            Storage::Composite(composite) => composite.slice(span)?,
        })
    }

    fn as_read(&self) -> &dyn TextRead {
        match self {
            Storage::Flat(text) => text,
            Storage::Chunked(text) => text,
            Storage::Composite(text) => text,
            Storage::Sub(text) => text,
        }
    }

    /// Short name of the variant, for logs and diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Storage::Flat(_) => "flat",
            Storage::Chunked(_) => "chunked",
            Storage::Composite(_) => "composite",
            Storage::Sub(_) => "sub",
        }
    }
}

impl TextRead for Storage {
    fn len(&self) -> usize {
        self.as_read().len()
    }

    fn char_at(&self, position: usize) -> Result<char> {
        self.as_read().char_at(position)
    }

    fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()> {
        self.as_read().copy_to(source_index, dest, dest_index, count)
    }

    fn visit_runs(&self, span: TextSpan, visitor: &mut dyn FnMut(&[char])) {
        self.as_read().visit_runs(span, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(s: &str) -> Storage {
        Storage::Flat(FlatText::from_text(s))
    }

    #[test]
    fn test_slice_whole_returns_same_storage() {
        let text = flat("hello");
        let whole = text.slice(TextSpan::new(0, 5)).unwrap();
        assert!(whole.same_as(&text));
    }

    #[test]
    fn test_slice_of_slice_does_not_nest() {
        let text = flat("hello world");
        let outer = text.slice(TextSpan::new(2, 8)).unwrap();
        let inner = outer.slice(TextSpan::new(1, 3)).unwrap();
        match &inner {
            Storage::Sub(sub) => {
                assert!(sub.parent().same_as(&text));
                assert_eq!(sub.span(), TextSpan::new(3, 3));
            }
            other => panic!("expected sub view, got {}", other.kind()),
        }
        assert_eq!(inner.to_string_span(TextSpan::new(0, 3)).unwrap(), "lo ");
    }

    #[test]
    fn test_slice_out_of_range() {
        let text = flat("abc");
        assert!(text.slice(TextSpan::new(2, 2)).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_overflowing_span_is_out_of_range() {
        assert!(check_span(3, TextSpan::new(usize::MAX, 2)).unwrap_err().is_out_of_range());
        assert!(check_span(3, TextSpan::new(2, usize::MAX)).unwrap_err().is_out_of_range());
        let text = flat("abc");
        assert!(text
            .to_string_span(TextSpan::new(usize::MAX, 2))
            .unwrap_err()
            .is_out_of_range());
    }

    #[test]
    fn test_empty_slice() {
        let text = flat("abc");
        let empty = text.slice(TextSpan::new(3, 0)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_check_copy() {
        assert!(check_copy(5, 5, 0, 0, 0).is_ok());
        assert!(check_copy(5, 3, 10, 0, 3).is_err());
        assert!(check_copy(5, 0, 2, 1, 2).is_err());
        assert!(check_copy(5, usize::MAX, 10, 0, 1).is_err());
    }
}
