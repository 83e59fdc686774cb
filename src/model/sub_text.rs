//! A window over part of a flat or chunked storage

use crate::error::Result;
use crate::model::span::TextSpan;
use crate::model::storage::{check_copy, check_position, Storage, TextRead};

/// A window `[start, start + length)` over a parent storage
///
/// All reads are forwarded with an additive offset and bounds-checked
/// against the window, not the parent.
#[derive(Debug, Clone)]
pub struct SubText {
    parent: Box<Storage>,
    span: TextSpan,
}

impl SubText {
    /// `span` must lie inside `parent`; callers go through [`Storage::slice`].
    pub(crate) fn new(parent: Storage, span: TextSpan) -> Self {
        debug_assert!(span.end() <= parent.len());
        debug_assert!(!matches!(parent, Storage::Sub(_) | Storage::Composite(_)));
        SubText {
            parent: Box::new(parent),
            span,
        }
    }

    pub fn parent(&self) -> &Storage {
        &self.parent
    }

    /// The window, in parent coordinates
    pub fn span(&self) -> TextSpan {
        self.span
    }
}

impl TextRead for SubText {
    fn len(&self) -> usize {
        self.span.length
    }

    fn char_at(&self, position: usize) -> Result<char> {
        check_position(self.span.length, position)?;
        self.parent.char_at(self.span.start + position)
    }

    fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()> {
        check_copy(self.span.length, source_index, dest.len(), dest_index, count)?;
        self.parent
            .copy_to(self.span.start + source_index, dest, dest_index, count)
    }

    fn visit_runs(&self, span: TextSpan, visitor: &mut dyn FnMut(&[char])) {
        self.parent.visit_runs(
            TextSpan::new(self.span.start + span.start, span.length),
            visitor,
        )
    }
}
