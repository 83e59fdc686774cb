//! Content equality and hashing
//!
//! Two snapshots are content-equal when they hold the same chars, whatever
//! their storage, encoding, checksum algorithm or history.

use crate::model::source_text::SourceText;
use crate::model::span::TextSpan;
use crate::model::storage::TextRead;
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};

/// SHA-256 of a text's chars encoded as UTF-8
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub(crate) fn of(text: &dyn TextRead) -> Self {
        let mut hasher = Sha256::new();
        let mut utf8 = [0u8; 4];
        text.visit_runs(TextSpan::new(0, text.len()), &mut |run| {
            for ch in run {
                hasher.update(ch.encode_utf8(&mut utf8).as_bytes());
            }
        });
        ContentHash(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The first eight bytes, little endian
    pub fn to_u64(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(head)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(")?;
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Equality and hashing over optional snapshots by content
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceTextComparer;

impl SourceTextComparer {
    /// Hash reported for an absent snapshot
    pub const NULL_HASH: u64 = 0;

    pub fn equals(&self, a: Option<&SourceText>, b: Option<&SourceText>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.content_equals(b),
            _ => false,
        }
    }

    pub fn hash(&self, text: Option<&SourceText>) -> u64 {
        text.map_or(Self::NULL_HASH, |text| text.content_hash().to_u64())
    }
}

/// A snapshot keyed by content, for use in hashed collections
#[derive(Debug, Clone)]
pub struct ContentKey(pub SourceText);

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.content_equals(&other.0)
    }
}

impl Eq for ContentKey {}

impl Hash for ContentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.content_hash().hash(state);
    }
}
