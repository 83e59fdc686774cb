//! Line break recognition
//!
//! Recognized breaks: CR, LF, NEL (U+0085), LINE SEPARATOR (U+2028) and
//! PARAGRAPH SEPARATOR (U+2029). CR immediately followed by LF is one break
//! of length 2; every other combination (CR CR, LF CR, ...) is a sequence of
//! one-char breaks.

use crate::model::storage::TextRead;

pub const CR: char = '\r';
pub const LF: char = '\n';
pub const NEL: char = '\u{0085}';
pub const LINE_SEPARATOR: char = '\u{2028}';
pub const PARAGRAPH_SEPARATOR: char = '\u{2029}';

/// True for any char that starts a line break
#[inline]
pub fn is_line_break(ch: char) -> bool {
    matches!(ch, CR | LF | NEL | LINE_SEPARATOR | PARAGRAPH_SEPARATOR)
}

/// Length of the break starting at `position`, or 0 if no break starts there
pub fn line_break_len_at(text: &dyn TextRead, position: usize) -> usize {
    let Ok(ch) = text.char_at(position) else {
        return 0;
    };
    match ch {
        CR => match text.char_at(position + 1) {
            Ok(LF) => 2,
            _ => 1,
        },
        ch if is_line_break(ch) => 1,
        _ => 0,
    }
}

/// Incremental scanner producing line start offsets.
///
/// Feed runs of chars in order; a CR at the end of one run and an LF at the
/// start of the next are still recognized as one break, so the result does
/// not depend on how the text is split.
#[derive(Debug)]
pub struct LineStartScanner {
    starts: Vec<usize>,
    position: usize,
    pending_cr: bool,
}

impl Default for LineStartScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LineStartScanner {
    pub fn new() -> Self {
        LineStartScanner {
            starts: vec![0],
            position: 0,
            pending_cr: false,
        }
    }

    pub fn feed(&mut self, run: &[char]) {
        for &ch in run {
            if self.pending_cr {
                self.pending_cr = false;
                if ch == LF {
                    self.position += 1;
                    self.starts.push(self.position);
                    continue;
                }
                self.starts.push(self.position);
            }
            match ch {
                CR => self.pending_cr = true,
                ch if is_line_break(ch) => self.starts.push(self.position + 1),
                _ => {}
            }
            self.position += 1;
        }
    }

    /// Line starts, always beginning with 0 and holding at least one entry
    pub fn finish(mut self) -> Vec<usize> {
        if self.pending_cr {
            self.starts.push(self.position);
        }
        self.starts
    }
}
