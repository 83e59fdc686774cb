//! Flat storage: all chars in one contiguous block

use crate::error::Result;
use crate::model::span::TextSpan;
use crate::model::storage::{check_copy, check_position, TextRead};
use std::fmt;
use std::sync::Arc;

/// Text held in one contiguous block of chars
#[derive(Clone)]
pub struct FlatText {
    chars: Arc<[char]>,
}

impl FlatText {
    pub fn empty() -> Self {
        FlatText {
            chars: Arc::from(Vec::new()),
        }
    }

    pub fn from_text(text: &str) -> Self {
        FlatText {
            chars: text.chars().collect(),
        }
    }

    pub fn from_chars(chars: impl Into<Arc<[char]>>) -> Self {
        FlatText {
            chars: chars.into(),
        }
    }

    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }

    pub(crate) fn same_as(&self, other: &FlatText) -> bool {
        Arc::ptr_eq(&self.chars, &other.chars)
    }
}

impl fmt::Debug for FlatText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatText")
            .field("len", &self.chars.len())
            .finish()
    }
}

impl TextRead for FlatText {
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn char_at(&self, position: usize) -> Result<char> {
        check_position(self.chars.len(), position)?;
        Ok(self.chars[position])
    }

    fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()> {
        check_copy(self.chars.len(), source_index, dest.len(), dest_index, count)?;
        dest[dest_index..dest_index + count]
            .copy_from_slice(&self.chars[source_index..source_index + count]);
        Ok(())
    }

    fn visit_runs(&self, span: TextSpan, visitor: &mut dyn FnMut(&[char])) {
        if !span.is_empty() {
            visitor(&self.chars[span.start..span.end()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_at() {
        let text = FlatText::from_text("héllo");
        assert_eq!(text.len(), 5);
        assert_eq!(text.char_at(1).unwrap(), 'é');
        assert!(text.char_at(5).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_copy_to_boundaries() {
        let text = FlatText::from_text("abcdef");
        let mut dest = ['_'; 4];
        text.copy_to(2, &mut dest, 1, 3).unwrap();
        assert_eq!(dest, ['_', 'c', 'd', 'e']);

        // zero-length copy at the very end never fails
        text.copy_to(6, &mut dest, 4, 0).unwrap();

        assert!(text.copy_to(4, &mut dest, 0, 3).is_err());
        assert!(text.copy_to(0, &mut dest, 2, 3).is_err());
    }

    #[test]
    fn test_to_string_span() {
        let text = FlatText::from_text("hello world");
        assert_eq!(text.to_string_span(TextSpan::new(6, 5)).unwrap(), "world");
        assert!(text
            .to_string_span(TextSpan::new(6, 6))
            .unwrap_err()
            .is_out_of_range());
    }
}
