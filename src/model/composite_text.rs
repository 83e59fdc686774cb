//! Composite storage: one logical text made of child storages
//!
//! Edits produce composites of the form (unchanged prefix, inserted text,
//! unchanged suffix) without copying the unchanged parts. Children are kept
//! flat (a composite never holds another composite) and the child count is
//! bounded by merging small neighbours, so lookup stays near O(log k).

use crate::error::Result;
use crate::model::chunked_text::{ChunkBuilder, DEFAULT_CHUNK_CAPACITY};
use crate::model::flat_text::FlatText;
use crate::model::span::TextSpan;
use crate::model::storage::{check_copy, check_position, Storage, TextRead};
use crate::model::sub_text::SubText;
use std::fmt;
use std::sync::Arc;

/// Segment count above which small segments get merged
pub const MAX_SEGMENTS_BEFORE_REDUCTION: usize = 64;
/// Merging continues until at most this many segments remain
pub const TARGET_SEGMENTS_AFTER_REDUCTION: usize = 32;
/// Segments up to this many chars are merged on the first reduction pass
const INITIAL_COMBINE_SIZE: usize = 32;

#[derive(Clone)]
pub struct CompositeText {
    inner: Arc<CompositeInner>,
}

struct CompositeInner {
    segments: Vec<Storage>,
    /// `segment_starts[i]` is the offset of the first char of segment `i`
    segment_starts: Vec<usize>,
    len: usize,
}

impl CompositeText {
    /// Concatenate `segments` into one storage.
    ///
    /// Nested composites are spliced in, empty segments dropped, and
    /// adjacent views over the same parent joined. Returns the single
    /// remaining segment directly when there is only one.
    pub fn build(segments: impl IntoIterator<Item = Storage>) -> Storage {
        let mut normalized = Vec::new();
        for segment in segments {
            push_segment(&mut normalized, segment);
        }
        reduce_segment_count(&mut normalized);

        match normalized.len() {
            0 => Storage::empty(),
            1 => normalized.swap_remove(0),
            _ => Storage::Composite(CompositeText::from_normalized(normalized)),
        }
    }

    fn from_normalized(segments: Vec<Storage>) -> CompositeText {
        let mut segment_starts = Vec::with_capacity(segments.len());
        let mut len = 0;
        for segment in &segments {
            segment_starts.push(len);
            len += segment.len();
        }
        CompositeText {
            inner: Arc::new(CompositeInner {
                segments,
                segment_starts,
                len,
            }),
        }
    }

    pub fn segments(&self) -> &[Storage] {
        &self.inner.segments
    }

    pub(crate) fn same_as(&self, other: &CompositeText) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn segment_index(&self, position: usize) -> usize {
        self.inner
            .segment_starts
            .partition_point(|&start| start <= position)
            - 1
    }

    /// Slice by slicing the overlapped children; `span` is already validated
    pub(crate) fn slice(&self, span: TextSpan) -> Result<Storage> {
        let mut pieces = Vec::new();
        let mut index = self.segment_index(span.start);
        let mut position = span.start;
        while position < span.end() {
            let segment = &self.inner.segments[index];
            let segment_start = self.inner.segment_starts[index];
            let from = position - segment_start;
            let to = segment.len().min(span.end() - segment_start);
            pieces.push(segment.slice(TextSpan::new(from, to - from))?);
            position = segment_start + to;
            index += 1;
        }
        Ok(CompositeText::build(pieces))
    }
}

impl fmt::Debug for CompositeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeText")
            .field("len", &self.inner.len)
            .field("segments", &self.inner.segments)
            .finish()
    }
}

fn push_segment(out: &mut Vec<Storage>, segment: Storage) {
    if segment.is_empty() {
        return;
    }
    match segment {
        Storage::Composite(composite) => {
            for child in composite.segments() {
                push_segment(out, child.clone());
            }
        }
        Storage::Sub(sub) => {
            if let Some(Storage::Sub(last)) = out.last() {
                if last.parent().same_as(sub.parent()) && last.span().end() == sub.span().start {
                    let parent = last.parent().clone();
                    let joined = TextSpan::new(last.span().start, last.span().length + sub.span().length);
                    out.pop();
                    if joined.start == 0 && joined.length == parent.len() {
                        out.push(parent);
                    } else {
                        out.push(Storage::Sub(SubText::new(parent, joined)));
                    }
                    return;
                }
            }
            out.push(Storage::Sub(sub));
        }
        other => out.push(other),
    }
}

fn reduce_segment_count(segments: &mut Vec<Storage>) {
    if segments.len() <= MAX_SEGMENTS_BEFORE_REDUCTION {
        return;
    }
    let before = segments.len();
    let mut combine_size = INITIAL_COMBINE_SIZE;
    while segments.len() > TARGET_SEGMENTS_AFTER_REDUCTION {
        combine_small_segments(segments, combine_size);
        combine_size = combine_size.saturating_mul(2);
    }
    tracing::debug!(before, after = segments.len(), "reduced composite segment count");
}

/// Replace every run of adjacent segments no longer than `max_size` with one copy
fn combine_small_segments(segments: &mut Vec<Storage>, max_size: usize) {
    let mut result = Vec::with_capacity(segments.len());
    let mut run = Vec::new();
    for segment in segments.drain(..) {
        if segment.len() <= max_size {
            run.push(segment);
        } else {
            flush_run(&mut result, &mut run);
            result.push(segment);
        }
    }
    flush_run(&mut result, &mut run);
    *segments = result;
}

fn flush_run(result: &mut Vec<Storage>, run: &mut Vec<Storage>) {
    if run.len() <= 1 {
        result.append(run);
        return;
    }
    let total = run.iter().map(Storage::len).sum();
    // merges larger than one chunk are copied into chunks
    if total > DEFAULT_CHUNK_CAPACITY {
        let mut builder = ChunkBuilder::new(DEFAULT_CHUNK_CAPACITY);
        for segment in run.drain(..) {
            segment.visit_runs(TextSpan::new(0, segment.len()), &mut |part| {
                builder.push_chars(part)
            });
        }
        result.push(builder.finish());
        return;
    }
    let mut chars = Vec::with_capacity(total);
    for segment in run.drain(..) {
        segment.visit_runs(TextSpan::new(0, segment.len()), &mut |part| {
            chars.extend_from_slice(part)
        });
    }
    result.push(Storage::Flat(FlatText::from_chars(chars)));
}

impl TextRead for CompositeText {
    fn len(&self) -> usize {
        self.inner.len
    }

    fn char_at(&self, position: usize) -> Result<char> {
        check_position(self.inner.len, position)?;
        let index = self.segment_index(position);
        self.inner.segments[index].char_at(position - self.inner.segment_starts[index])
    }

    fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()> {
        check_copy(self.inner.len, source_index, dest.len(), dest_index, count)?;
        if count == 0 {
            return Ok(());
        }
        let mut index = self.segment_index(source_index);
        let mut offset = source_index - self.inner.segment_starts[index];
        let mut remaining = count;
        let mut written = dest_index;
        while remaining > 0 {
            let segment = &self.inner.segments[index];
            let take = remaining.min(segment.len() - offset);
            segment.copy_to(offset, dest, written, take)?;
            written += take;
            remaining -= take;
            index += 1;
            offset = 0;
        }
        Ok(())
    }

    fn visit_runs(&self, span: TextSpan, visitor: &mut dyn FnMut(&[char])) {
        if span.is_empty() {
            return;
        }
        let mut index = self.segment_index(span.start);
        let mut position = span.start;
        while position < span.end() {
            let segment = &self.inner.segments[index];
            let segment_start = self.inner.segment_starts[index];
            let from = position - segment_start;
            let to = segment.len().min(span.end() - segment_start);
            segment.visit_runs(TextSpan::new(from, to - from), visitor);
            position = segment_start + to;
            index += 1;
        }
    }
}
