//! Chunked storage for large inputs
//!
//! Chars live in a sequence of fixed-capacity chunks so no single allocation
//! grows with the input, and decoding can fill chunks as bytes stream in.
//! A prefix-sum array of chunk start offsets gives O(log n) position lookup.

use crate::error::Result;
use crate::model::flat_text::FlatText;
use crate::model::span::TextSpan;
use crate::model::storage::{check_copy, check_position, Storage, TextRead};
use std::fmt;
use std::sync::Arc;

/// Default chunk capacity in chars
pub const DEFAULT_CHUNK_CAPACITY: usize = 40 * 1024;

#[derive(Clone)]
pub struct ChunkedText {
    inner: Arc<ChunkedInner>,
}

struct ChunkedInner {
    chunks: Vec<Box<[char]>>,
    /// `chunk_starts[i]` is the offset of the first char of chunk `i`
    chunk_starts: Vec<usize>,
    len: usize,
}

impl ChunkedText {
    /// Number of chunks
    pub fn chunk_count(&self) -> usize {
        self.inner.chunks.len()
    }

    /// Index of the chunk holding `position` (which must be `< len`)
    fn chunk_index(&self, position: usize) -> usize {
        self.inner
            .chunk_starts
            .partition_point(|&start| start <= position)
            - 1
    }

    pub(crate) fn same_as(&self, other: &ChunkedText) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ChunkedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedText")
            .field("len", &self.inner.len)
            .field("chunks", &self.inner.chunks.len())
            .finish()
    }
}

impl TextRead for ChunkedText {
    fn len(&self) -> usize {
        self.inner.len
    }

    fn char_at(&self, position: usize) -> Result<char> {
        check_position(self.inner.len, position)?;
        let index = self.chunk_index(position);
        Ok(self.inner.chunks[index][position - self.inner.chunk_starts[index]])
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

        let mut chunk = self.chunk_index(source_index);
        let mut offset_in_chunk = source_index - self.inner.chunk_starts[chunk];
        let mut remaining = count;
        let mut written = dest_index;
        while remaining > 0 {
            let data = &self.inner.chunks[chunk];
            let take = remaining.min(data.len() - offset_in_chunk);
            dest[written..written + take]
                .copy_from_slice(&data[offset_in_chunk..offset_in_chunk + take]);
            written += take;
            remaining -= take;
            chunk += 1;
            offset_in_chunk = 0;
        }
        Ok(())
    }

    fn visit_runs(&self, span: TextSpan, visitor: &mut dyn FnMut(&[char])) {
        if span.is_empty() {
            return;
        }
        let mut chunk = self.chunk_index(span.start);
        let mut position = span.start;
        while position < span.end() {
            let start = self.inner.chunk_starts[chunk];
            let data = &self.inner.chunks[chunk];
            let from = position - start;
            let to = data.len().min(span.end() - start);
            visitor(&data[from..to]);
            position = start + to;
            chunk += 1;
        }
    }
}

/// Accumulates chars into fixed-capacity chunks
pub struct ChunkBuilder {
    capacity: usize,
    current: Vec<char>,
    chunks: Vec<Box<[char]>>,
    chunk_starts: Vec<usize>,
    len: usize,
}

impl ChunkBuilder {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ChunkBuilder {
            capacity,
            current: Vec::new(),
            chunks: Vec::new(),
            chunk_starts: Vec::new(),
            len: 0,
        }
    }

    pub fn push(&mut self, ch: char) {
        if self.current.len() == self.capacity {
            self.seal_current();
        }
        if self.current.capacity() == 0 {
            self.current.reserve_exact(self.capacity);
        }
        self.current.push(ch);
        self.len += 1;
    }

    pub fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.push(ch);
        }
    }

    pub fn push_chars(&mut self, chars: &[char]) {
        for &ch in chars {
            self.push(ch);
        }
    }

    /// Chars pushed so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn seal_current(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let start = self.len - self.current.len();
        let chunk = std::mem::take(&mut self.current).into_boxed_slice();
        self.chunk_starts.push(start);
        self.chunks.push(chunk);
    }

    /// Finish as a chunked text, even when everything fit in one chunk
    pub fn finish_chunked(mut self) -> ChunkedText {
        self.seal_current();
        ChunkedText {
            inner: Arc::new(ChunkedInner {
                chunks: self.chunks,
                chunk_starts: self.chunk_starts,
                len: self.len,
            }),
        }
    }

    /// Finish as flat storage when the content fit in a single chunk,
    /// chunked storage otherwise
    pub fn finish(mut self) -> Storage {
        if self.chunks.is_empty() {
            let current = std::mem::take(&mut self.current);
            return Storage::Flat(FlatText::from_chars(current));
        }
        Storage::Chunked(self.finish_chunked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str = "Hello, World!";

    fn build(text: &str, capacity: usize) -> ChunkedText {
        let mut builder = ChunkBuilder::new(capacity);
        builder.push_str(text);
        builder.finish_chunked()
    }

    #[test]
    fn test_copy_phrase_across_chunk_boundaries() {
        let capacity = 32;
        let repeats = 10;
        let text = build(&PHRASE.repeat(repeats), capacity);
        assert!(text.chunk_count() >= 3);

        let expected: Vec<char> = PHRASE.chars().collect();
        let mut buf = ['\0'; 13];
        for start in (0..repeats * 13).step_by(13) {
            text.copy_to(start, &mut buf, 0, 13).unwrap();
            assert_eq!(buf.as_slice(), expected.as_slice(), "start {start}");
        }
    }

    #[test]
    fn test_char_at_on_chunk_edges() {
        let source: String = ('a'..='z').collect();
        let text = build(&source, 5);
        assert_eq!(text.chunk_count(), 6);
        for (i, ch) in source.chars().enumerate() {
            assert_eq!(text.char_at(i).unwrap(), ch);
        }
        assert!(text.char_at(26).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_copy_exactly_at_boundary() {
        let text = build("abcdefghij", 5);
        let mut buf = ['_'; 5];
        text.copy_to(5, &mut buf, 0, 5).unwrap();
        assert_eq!(buf, ['f', 'g', 'h', 'i', 'j']);
        text.copy_to(4, &mut buf, 0, 2).unwrap();
        assert_eq!(&buf[..2], &['e', 'f']);
        text.copy_to(10, &mut buf, 0, 0).unwrap();
        assert!(text.copy_to(9, &mut buf, 0, 2).is_err());
    }

    #[test]
    fn test_visit_runs_splits_per_chunk() {
        let text = build("abcdefghij", 4);
        let mut runs = Vec::new();
        text.visit_runs(TextSpan::new(2, 7), &mut |run| {
            runs.push(run.iter().collect::<String>())
        });
        assert_eq!(runs, vec!["cd", "efgh", "i"]);
    }

    #[test]
    fn test_finish_small_input_is_flat() {
        let mut builder = ChunkBuilder::new(16);
        builder.push_str("short");
        assert!(matches!(builder.finish(), Storage::Flat(_)));

        let mut builder = ChunkBuilder::new(4);
        builder.push_str("longer than four");
        assert!(matches!(builder.finish(), Storage::Chunked(_)));
    }

    #[test]
    fn test_empty_builder() {
        let storage = ChunkBuilder::new(8).finish();
        assert_eq!(storage.len(), 0);
        let chunked = ChunkBuilder::new(8).finish_chunked();
        assert_eq!(chunked.len(), 0);
        assert_eq!(chunked.chunk_count(), 0);
    }
}
