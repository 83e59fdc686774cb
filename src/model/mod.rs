//! Core text model
//!
//! Storage strategies, the snapshot type, encodings and checksums, and the
//! edit history that relates snapshots to each other.

mod change_info;
pub mod checksum;
pub mod chunked_text;
pub mod composite_text;
pub mod content;
mod decoder;
pub mod encoding;
pub mod flat_text;
pub mod source_text;
pub mod span;
pub mod storage;
pub mod sub_text;
pub mod text_lines;
