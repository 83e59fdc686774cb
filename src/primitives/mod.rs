//! Low-level primitives
//!
//! Line break classification and the line start index.

pub mod line_break;
pub mod line_index;
