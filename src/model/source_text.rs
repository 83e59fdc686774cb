//! Immutable text snapshots
//!
//! A [`SourceText`] is a cheap handle over shared, immutable state. Edits
//! never mutate a snapshot: `with_changes` builds a new one that shares every
//! unchanged region with its predecessor and remembers how it was derived, so
//! later callers can ask which ranges differ between two related snapshots.
//!
//! Derived data (line index, checksum, content hash) is computed on first use
//! and published once; concurrent readers may race to compute it, but only one
//! result is ever observed.

use crate::config::DecodeOptions;
use crate::error::{Result, TextError};
use crate::model::change_info::{compose, diff_common_affixes, validate_changes, ChangeInfo};
use crate::model::checksum::{Checksum, ChecksumAlgorithm, ChecksumHasher};
use crate::model::composite_text::CompositeText;
use crate::model::content::ContentHash;
use crate::model::decoder;
use crate::model::encoding::Encoding;
use crate::model::flat_text::FlatText;
use crate::model::span::{TextChange, TextChangeRange, TextSpan};
use crate::model::storage::{check_span, Storage, TextRead};
use crate::model::text_lines::TextLines;
use crate::primitives::line_index::LineIndex;
use once_cell::race::OnceBox;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// Chars compared per block by [`SourceText::content_equals`]
const COMPARE_BLOCK: usize = 1024;

/// A shareable, immutable text snapshot
#[derive(Clone)]
pub struct SourceText {
    inner: Arc<SourceTextInner>,
}

pub(crate) struct SourceTextInner {
    storage: Storage,
    encoding: Option<Encoding>,
    checksum_algorithm: ChecksumAlgorithm,
    checksum: OnceBox<Checksum>,
    content_hash: OnceBox<ContentHash>,
    lines: OnceBox<LineIndex>,
    origin: Origin,
}

/// How a snapshot came to be
enum Origin {
    Root,
    /// Produced by `with_changes`
    Changed {
        info: Arc<ChangeInfo>,
        changes: Arc<[TextChange]>,
    },
    /// A window over `parent`; `span` is relative to `parent`, which is never a window itself
    Window { parent: SourceText, span: TextSpan },
}

impl SourceText {
    fn build(
        storage: Storage,
        encoding: Option<Encoding>,
        checksum_algorithm: ChecksumAlgorithm,
        checksum: Option<Checksum>,
        origin: Origin,
    ) -> Self {
        let checksum = match checksum {
            Some(checksum) => OnceBox::with_value(Box::new(checksum)),
            None => OnceBox::new(),
        };
        SourceText {
            inner: Arc::new(SourceTextInner {
                storage,
                encoding,
                checksum_algorithm,
                checksum,
                content_hash: OnceBox::new(),
                lines: OnceBox::new(),
                origin,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// A flat snapshot of `text` with no encoding and the default checksum algorithm
    pub fn from_string(text: impl AsRef<str>) -> Self {
        Self::from_string_with(text, None, ChecksumAlgorithm::default())
    }

    /// A flat snapshot of `text`; `encoding` only affects the checksum
    pub fn from_string_with(
        text: impl AsRef<str>,
        encoding: Option<Encoding>,
        checksum_algorithm: ChecksumAlgorithm,
    ) -> Self {
        Self::from_storage(
            Storage::Flat(FlatText::from_text(text.as_ref())),
            encoding,
            checksum_algorithm,
        )
    }

    /// Like [`SourceText::from_string_with`] for inputs that may be absent
    pub fn from_optional_str(
        text: Option<&str>,
        encoding: Option<Encoding>,
        checksum_algorithm: ChecksumAlgorithm,
    ) -> Result<Self> {
        let text = text.ok_or(TextError::NullInput("text"))?;
        Ok(Self::from_string_with(text, encoding, checksum_algorithm))
    }

    /// A flat snapshot copied from a char slice
    pub fn from_chars(chars: &[char]) -> Self {
        Self::from_storage(
            Storage::Flat(FlatText::from_chars(chars)),
            None,
            ChecksumAlgorithm::default(),
        )
    }

    /// Wrap an already built storage
    pub fn from_storage(
        storage: Storage,
        encoding: Option<Encoding>,
        checksum_algorithm: ChecksumAlgorithm,
    ) -> Self {
        Self::build(storage, encoding, checksum_algorithm, None, Origin::Root)
    }

    /// The concatenation of `parts`, sharing their storage.
    ///
    /// Takes its encoding and checksum algorithm from the first part.
    pub fn concat(parts: &[SourceText]) -> Self {
        let (encoding, algorithm) = parts
            .first()
            .map(|p| (p.encoding(), p.checksum_algorithm()))
            .unwrap_or((None, ChecksumAlgorithm::default()));
        let storage = CompositeText::build(parts.iter().map(|p| p.storage().clone()));
        Self::from_storage(storage, encoding, algorithm)
    }

    /// Decode an in-memory byte sequence
    pub fn from_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<Self> {
        Ok(Self::from_decoded(decoder::decode_bytes(bytes, options)?, options))
    }

    /// Decode everything `reader` yields
    pub fn from_reader<R: Read>(reader: R, options: &DecodeOptions) -> Result<Self> {
        Ok(Self::from_decoded(decoder::decode_reader(reader, options)?, options))
    }

    fn from_decoded(decoded: decoder::Decoded, options: &DecodeOptions) -> Self {
        // the checksum of decoded text covers the raw input bytes
        Self::build(
            decoded.storage,
            Some(decoded.encoding),
            options.checksum_algorithm,
            Some(decoded.checksum),
            Origin::Root,
        )
    }

    // ---------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------

    /// Number of chars
    pub fn len(&self) -> usize {
        self.inner.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The char at `position`, failing with `OutOfRange` past the end
    pub fn char_at(&self, position: usize) -> Result<char> {
        self.inner.storage.char_at(position)
    }

    /// Copy `count` chars starting at `source_index` into `dest[dest_index..]`
    pub fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()> {
        self.inner
            .storage
            .copy_to(source_index, dest, dest_index, count)
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    /// Encoding the text was decoded from or declared with, if any
    pub fn encoding(&self) -> Option<Encoding> {
        self.inner.encoding
    }

    pub fn checksum_algorithm(&self) -> ChecksumAlgorithm {
        self.inner.checksum_algorithm
    }

    /// The chars of `span` as a `String`
    pub fn to_string_in(&self, span: TextSpan) -> Result<String> {
        self.inner.storage.to_string_span(span)
    }

    /// Write the chars of `span` to `out`
    pub fn write_to(&self, out: &mut dyn fmt::Write, span: TextSpan) -> Result<()> {
        check_span(self.len(), span)?;
        let mut buf = String::new();
        let mut failed = false;
        self.inner.storage.visit_runs(span, &mut |run| {
            if failed {
                return;
            }
            buf.clear();
            buf.extend(run);
            failed = out.write_str(&buf).is_err();
        });
        if failed {
            return Err(std::io::Error::other("formatter error").into());
        }
        Ok(())
    }

    /// True if both handles refer to the same snapshot
    pub fn ptr_eq(&self, other: &SourceText) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ---------------------------------------------------------------------
    // Derived data
    // ---------------------------------------------------------------------

    fn line_index(&self) -> &LineIndex {
        self.inner.lines.get_or_init(|| {
            let index = match &self.inner.origin {
                Origin::Window { parent, span } => {
                    LineIndex::for_window(parent.line_index(), parent.storage(), *span)
                }
                _ => LineIndex::build(&self.inner.storage),
            };
            tracing::trace!(lines = index.line_count(), chars = self.len(), "built line index");
            Box::new(index)
        })
    }

    pub fn lines(&self) -> TextLines<'_> {
        TextLines::new(self, self.line_index())
    }

    /// Checksum of the encoded content.
    ///
    /// For decoded text this covers the input bytes as read; otherwise the
    /// content is encoded with the text's encoding (UTF-8 if none), preceded
    /// by that encoding's BOM if it has one.
    pub fn checksum(&self) -> &Checksum {
        self.inner
            .checksum
            .get_or_init(|| Box::new(self.compute_checksum()))
    }

    fn compute_checksum(&self) -> Checksum {
        let encoding = self.inner.encoding.unwrap_or(Encoding::Utf8);
        let mut hasher = ChecksumHasher::new(self.inner.checksum_algorithm);
        if let Some(bom) = encoding.bom_bytes() {
            hasher.update(bom);
        }
        let mut chars = String::new();
        let mut bytes = Vec::new();
        self.inner
            .storage
            .visit_runs(TextSpan::new(0, self.len()), &mut |run| {
                chars.clear();
                chars.extend(run);
                bytes.clear();
                encoding.encode_into(&chars, &mut bytes);
                hasher.update(&bytes);
            });
        hasher.finish()
    }

    /// Digest of the chars alone, independent of encoding and storage
    pub fn content_hash(&self) -> ContentHash {
        *self
            .inner
            .content_hash
            .get_or_init(|| Box::new(ContentHash::of(&self.inner.storage)))
    }

    /// True if both snapshots hold the same chars
    pub fn content_equals(&self, other: &SourceText) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let len = self.len();
        if len != other.len() {
            return false;
        }
        if let (Some(a), Some(b)) = (self.inner.content_hash.get(), other.inner.content_hash.get()) {
            if a != b {
                return false;
            }
        }

        let mut left = vec!['\0'; COMPARE_BLOCK.min(len)];
        let mut right = left.clone();
        let mut position = 0;
        while position < len {
            let count = COMPARE_BLOCK.min(len - position);
            if self.copy_to(position, &mut left, 0, count).is_err()
                || other.copy_to(position, &mut right, 0, count).is_err()
                || left[..count] != right[..count]
            {
                return false;
            }
            position += count;
        }
        true
    }

    // ---------------------------------------------------------------------
    // Derivation
    // ---------------------------------------------------------------------

    /// Apply `changes`, which must be ascending, non-overlapping and in range.
    ///
    /// The result shares every unchanged region with `self`, keeps its
    /// encoding and checksum algorithm, and records the edit so
    /// [`SourceText::change_ranges_relative_to`] can answer without diffing.
    pub fn with_changes(&self, changes: &[TextChange]) -> Result<SourceText> {
        let len = self.len();
        validate_changes(changes, len)?;
        if changes.is_empty() {
            return Ok(self.clone());
        }

        let storage = self.storage();
        let mut segments = Vec::with_capacity(changes.len() * 2 + 1);
        let mut position = 0;
        for change in changes {
            if change.span.start > position {
                segments.push(storage.slice(TextSpan::from_bounds(position, change.span.start)?)?);
            }
            if !change.new_text.is_empty() {
                segments.push(Storage::Flat(FlatText::from_text(&change.new_text)));
            }
            position = change.span.end();
        }
        if position < len {
            segments.push(storage.slice(TextSpan::from_bounds(position, len)?)?);
        }
        let storage = CompositeText::build(segments);

        let previous = match &self.inner.origin {
            Origin::Changed { info, .. } => Some(info.clone()),
            _ => None,
        };
        let ranges: Arc<[TextChangeRange]> =
            changes.iter().map(TextChange::to_change_range).collect();
        let info = ChangeInfo::new(ranges, Arc::downgrade(&self.inner), previous);

        tracing::debug!(
            changes = changes.len(),
            old_len = len,
            new_len = storage.len(),
            storage = storage.kind(),
            "applied text changes"
        );
        Ok(Self::build(
            storage,
            self.inner.encoding,
            self.inner.checksum_algorithm,
            None,
            Origin::Changed {
                info: Arc::new(info),
                changes: changes.into(),
            },
        ))
    }

    /// Replace the chars of `span` with `new_text`
    pub fn replace(&self, span: TextSpan, new_text: impl Into<String>) -> Result<SourceText> {
        self.with_changes(&[TextChange::new(span, new_text)])
    }

    /// A snapshot of the chars in `span`, sharing this one's storage.
    ///
    /// Its line index is derived from this snapshot's without rescanning.
    pub fn sub_text(&self, span: TextSpan) -> Result<SourceText> {
        check_span(self.len(), span)?;
        if span.start == 0 && span.length == self.len() {
            return Ok(self.clone());
        }
        let storage = self.storage().slice(span)?;
        let (parent, parent_span) = match &self.inner.origin {
            Origin::Window {
                parent,
                span: outer,
            } => (
                parent.clone(),
                TextSpan::new(outer.start + span.start, span.length),
            ),
            _ => (self.clone(), span),
        };
        Ok(Self::build(
            storage,
            self.inner.encoding,
            self.inner.checksum_algorithm,
            None,
            Origin::Window {
                parent,
                span: parent_span,
            },
        ))
    }

    /// Everything from `start` to the end
    pub fn sub_text_from(&self, start: usize) -> Result<SourceText> {
        let len = self.len();
        if start > len {
            return Err(TextError::out_of_range("start", start, format!("0..={len}")));
        }
        self.sub_text(TextSpan::new(start, len - start))
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// The changes passed to `with_changes` to produce this snapshot, if any
    pub fn changes(&self) -> &[TextChange] {
        match &self.inner.origin {
            Origin::Changed { changes, .. } => changes,
            _ => &[],
        }
    }

    /// The snapshot this one was edited from, if it is still alive
    pub fn previous(&self) -> Option<SourceText> {
        match &self.inner.origin {
            Origin::Changed { info, .. } => info.old.upgrade().map(|inner| SourceText { inner }),
            _ => None,
        }
    }

    /// Ranges of `old` that were replaced to produce `self`.
    ///
    /// Exact when `old` is an ancestor reachable through recorded edits;
    /// otherwise a single range covering everything between the common
    /// prefix and suffix. Identical snapshots yield no ranges.
    pub fn change_ranges_relative_to(&self, old: &SourceText) -> Vec<TextChangeRange> {
        if self.ptr_eq(old) {
            return Vec::new();
        }

        if let Origin::Changed { info, .. } = &self.inner.origin {
            let mut steps: Vec<&[TextChangeRange]> = Vec::new();
            let mut current = Some(info);
            while let Some(step) = current {
                steps.push(&step.ranges);
                if step.is_from(&old.inner) {
                    let mut composed = steps.pop().map(<[_]>::to_vec).unwrap_or_default();
                    while let Some(newer) = steps.pop() {
                        composed = compose(&composed, newer);
                    }
                    return composed;
                }
                current = step.previous.as_ref();
            }
        }

        tracing::debug!(
            old_len = old.len(),
            new_len = self.len(),
            "no recorded edit path between snapshots, diffing content"
        );
        diff_common_affixes(old.storage(), self.storage())
    }

    /// Like [`SourceText::change_ranges_relative_to`], with the replacement text filled in
    pub fn text_changes_relative_to(&self, old: &SourceText) -> Result<Vec<TextChange>> {
        let mut delta = 0isize;
        let mut changes = Vec::new();
        for range in self.change_ranges_relative_to(old) {
            let new_start = range.span.start.saturating_add_signed(delta);
            let new_text = self.to_string_in(TextSpan::new(new_start, range.new_length))?;
            changes.push(TextChange::new(range.span, new_text));
            delta += range.delta();
        }
        Ok(changes)
    }
}

impl TextRead for SourceText {
    fn len(&self) -> usize {
        SourceText::len(self)
    }

    fn char_at(&self, position: usize) -> Result<char> {
        SourceText::char_at(self, position)
    }

    fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()> {
        SourceText::copy_to(self, source_index, dest, dest_index, count)
    }

    fn visit_runs(&self, span: TextSpan, visitor: &mut dyn FnMut(&[char])) {
        self.inner.storage.visit_runs(span, visitor)
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        SourceText::from_string(text)
    }
}

impl From<String> for SourceText {
    fn from(text: String) -> Self {
        SourceText::from_string(text)
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, TextSpan::new(0, self.len()))
            .map_err(|_| fmt::Error)
    }
}

impl fmt::Debug for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceText")
            .field("len", &self.len())
            .field("storage", &self.inner.storage.kind())
            .field("encoding", &self.inner.encoding)
            .field("checksum_algorithm", &self.inner.checksum_algorithm)
            .finish()
    }
}
