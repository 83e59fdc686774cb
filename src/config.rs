//! Decode options, loadable from JSON with per-field defaults

use crate::model::checksum::ChecksumAlgorithm;
use crate::model::chunked_text::DEFAULT_CHUNK_CAPACITY;
use crate::model::encoding::Encoding;
use serde::{Deserialize, Serialize};

/// Bytes read from a stream per block while decoding
pub const DEFAULT_READ_BLOCK_SIZE: usize = 4096;

/// Options controlling how raw bytes become a text snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Encoding declared by the caller. A BOM in the input overrides it.
    #[serde(default)]
    pub encoding: Option<Encoding>,

    /// Used when there is no BOM, no declared encoding, and the input is not valid UTF-8
    #[serde(default = "default_fallback_encoding")]
    pub default_encoding: Encoding,

    /// Algorithm for the checksum of the consumed bytes
    #[serde(default)]
    pub checksum_algorithm: ChecksumAlgorithm,

    /// Fail with `InvalidContent` when the decoded text looks binary
    #[serde(default = "default_false")]
    pub throw_if_binary: bool,

    /// Fail with `UnrepresentableSequence` on invalid input instead of substituting U+FFFD
    #[serde(default = "default_false")]
    pub strict: bool,

    /// Chars per chunk; inputs larger than one chunk get chunked storage
    #[serde(default = "default_chunk_capacity")]
    pub chunk_capacity: usize,

    /// Bytes pulled from a stream per read
    #[serde(default = "default_read_block_size")]
    pub read_block_size: usize,
}

fn default_fallback_encoding() -> Encoding {
    Encoding::Windows1252
}

fn default_false() -> bool {
    false
}

fn default_chunk_capacity() -> usize {
    DEFAULT_CHUNK_CAPACITY
}

fn default_read_block_size() -> usize {
    DEFAULT_READ_BLOCK_SIZE
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            encoding: None,
            default_encoding: default_fallback_encoding(),
            checksum_algorithm: ChecksumAlgorithm::default(),
            throw_if_binary: false,
            strict: false,
            chunk_capacity: default_chunk_capacity(),
            read_block_size: default_read_block_size(),
        }
    }
}

impl DecodeOptions {
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_checksum_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum_algorithm = algorithm;
        self
    }

    pub fn with_throw_if_binary(mut self, throw_if_binary: bool) -> Self {
        self.throw_if_binary = throw_if_binary;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_chunk_capacity(mut self, chunk_capacity: usize) -> Self {
        self.chunk_capacity = chunk_capacity;
        self
    }

    pub fn with_read_block_size(mut self, read_block_size: usize) -> Self {
        self.read_block_size = read_block_size;
        self
    }
}
