//! Immutable text snapshots with shared storage, lazy line indexing,
//! encoding-aware decoding, checksums, and edit history between snapshots.

pub mod config;
pub mod error;
pub mod model;
pub mod primitives;

pub use config::DecodeOptions;
pub use error::{Result, TextError};
pub use model::checksum::{Checksum, ChecksumAlgorithm};
pub use model::content::{ContentHash, ContentKey, SourceTextComparer};
pub use model::encoding::Encoding;
pub use model::source_text::SourceText;
pub use model::span::{TextChange, TextChangeRange, TextSpan};
pub use model::storage::{Storage, TextRead};
pub use model::text_lines::{LinePosition, LinePositionSpan, TextLine, TextLines};
