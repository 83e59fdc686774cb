//! Text encodings, BOM detection and the binary-content heuristic
//!
//! # BOM Detection
//!
//! The UTF-8 BOM (3 bytes) is tried first, then UTF-16 LE and UTF-16 BE
//! (2 bytes each). Only a complete BOM counts: two bytes `EF BB` at the end
//! of a short input are not a UTF-8 BOM.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Encoding Type
// ============================================================================

/// Supported text encodings
///
/// Decoded content is always held as chars. The encoding records how the
/// content was (or would be) serialized, which is what checksums cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// UTF-8 (default, most common)
    #[default]
    Utf8,
    /// UTF-8 with Byte Order Mark
    Utf8Bom,
    /// UTF-16 Little Endian, with BOM
    Utf16Le,
    /// UTF-16 Big Endian, with BOM
    Utf16Be,
    /// ASCII (7-bit, subset of UTF-8)
    Ascii,
    /// Latin-1 / ISO-8859-1 (Western European)
    Latin1,
    /// Windows-1252 / CP-1252 (Windows Western European, often called "ANSI")
    Windows1252,
    /// Windows-1250 / CP-1250 (Windows Central European)
    Windows1250,
    /// GB18030 (Chinese, superset of GBK)
    Gb18030,
    /// GBK (Chinese Simplified, subset of GB18030)
    Gbk,
    /// Shift-JIS (Japanese)
    ShiftJis,
    /// EUC-KR (Korean)
    EucKr,
}

impl Encoding {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf8Bom => "UTF-8 BOM",
            Self::Utf16Le => "UTF-16 LE",
            Self::Utf16Be => "UTF-16 BE",
            Self::Ascii => "ASCII",
            Self::Latin1 => "Latin-1",
            Self::Windows1252 => "Windows-1252",
            Self::Windows1250 => "Windows-1250",
            Self::Gb18030 => "GB18030",
            Self::Gbk => "GBK",
            Self::ShiftJis => "Shift-JIS",
            Self::EucKr => "EUC-KR",
        }
    }

    /// Get the encoding_rs Encoding for this type
    pub fn to_encoding_rs(&self) -> &'static encoding_rs::Encoding {
        match self {
            Self::Utf8 | Self::Utf8Bom | Self::Ascii => encoding_rs::UTF_8,
            Self::Utf16Le => encoding_rs::UTF_16LE,
            Self::Utf16Be => encoding_rs::UTF_16BE,
            Self::Latin1 => encoding_rs::WINDOWS_1252, // ISO-8859-1 maps to Windows-1252 per WHATWG
            Self::Windows1252 => encoding_rs::WINDOWS_1252,
            Self::Windows1250 => encoding_rs::WINDOWS_1250,
            Self::Gb18030 => encoding_rs::GB18030,
            Self::Gbk => encoding_rs::GBK,
            Self::ShiftJis => encoding_rs::SHIFT_JIS,
            Self::EucKr => encoding_rs::EUC_KR,
        }
    }

    /// Returns true if this encoding is serialized with a BOM
    pub fn has_bom(&self) -> bool {
        matches!(self, Self::Utf8Bom | Self::Utf16Le | Self::Utf16Be)
    }

    /// Get the BOM bytes for this encoding (if any)
    pub fn bom_bytes(&self) -> Option<&'static [u8]> {
        match self {
            Self::Utf8Bom => Some(UTF8_BOM),
            Self::Utf16Le => Some(UTF16_LE_BOM),
            Self::Utf16Be => Some(UTF16_BE_BOM),
            _ => None,
        }
    }

    /// All available encodings
    pub fn all() -> &'static [Encoding] {
        &[
            Self::Utf8,
            Self::Utf8Bom,
            Self::Utf16Le,
            Self::Utf16Be,
            Self::Ascii,
            Self::Latin1,
            Self::Windows1252,
            Self::Windows1250,
            Self::Gb18030,
            Self::Gbk,
            Self::ShiftJis,
            Self::EucKr,
        ]
    }

    /// Serialize `text` in this encoding, appending to `out`. No BOM is written.
    pub fn encode_into(&self, text: &str, out: &mut Vec<u8>) {
        match self {
            Self::Utf8 | Self::Utf8Bom | Self::Ascii => out.extend_from_slice(text.as_bytes()),
            Self::Utf16Le => {
                for code_unit in text.encode_utf16() {
                    out.extend_from_slice(&code_unit.to_le_bytes());
                }
            }
            Self::Utf16Be => {
                for code_unit in text.encode_utf16() {
                    out.extend_from_slice(&code_unit.to_be_bytes());
                }
            }
            _ => {
                let (cow, _encoding_used, _had_errors) = self.to_encoding_rs().encode(text);
                out.extend_from_slice(&cow);
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Encoding {
    type Err = String;

    /// Accepts display names and common labels, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        let found = Encoding::all().iter().copied().find(|encoding| {
            encoding
                .display_name()
                .to_ascii_lowercase()
                .replace(' ', "-")
                == wanted
        });
        if let Some(encoding) = found {
            return Ok(encoding);
        }
        match wanted.as_str() {
            "utf8" => Ok(Self::Utf8),
            "utf-16" | "utf16" | "utf-16le" | "utf16le" => Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Self::Utf16Be),
            "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            "cp1252" => Ok(Self::Windows1252),
            "cp1250" => Ok(Self::Windows1250),
            "shift-jis" | "sjis" => Ok(Self::ShiftJis),
            _ => Err(format!("unknown encoding: {s}")),
        }
    }
}

// ============================================================================
// BOM Detection
// ============================================================================

pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
pub const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
pub const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Detect a byte order mark at the start of `prefix`.
///
/// Returns the encoding it identifies and its length in bytes.
pub fn detect_bom(prefix: &[u8]) -> Option<(Encoding, usize)> {
    [
        (UTF8_BOM, Encoding::Utf8Bom),
        (UTF16_LE_BOM, Encoding::Utf16Le),
        (UTF16_BE_BOM, Encoding::Utf16Be),
    ]
    .into_iter()
    .find(|(bom, _)| prefix.starts_with(bom))
    .map(|(bom, encoding)| (encoding, bom.len()))
}

// ============================================================================
// Binary Detection
// ============================================================================

/// Tracks NUL runs across decoded blocks.
///
/// Two consecutive NUL chars anywhere flag the content as binary; an isolated
/// NUL is tolerated.
#[derive(Debug, Default, Clone)]
pub struct BinaryScan {
    previous_was_nul: bool,
    binary: bool,
}

impl BinaryScan {
    pub fn feed(&mut self, text: &str) {
        if self.binary {
            return;
        }
        for ch in text.chars() {
            let is_nul = ch == '\0';
            if is_nul && self.previous_was_nul {
                self.binary = true;
                return;
            }
            self.previous_was_nul = is_nul;
        }
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }
}

/// Binary heuristic over decoded text
pub fn is_binary(text: &str) -> bool {
    text.contains("\0\0")
}

// ============================================================================
// Tests
// ============================================================================
