//! Error types shared by every text operation.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TextError>;

/// Faults raised at the point a precondition is violated.
///
/// None of these are recovered internally. Callers decide whether to retry
/// with relaxed options (non-strict decoding, another encoding, ...).
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// An index or span lies outside the valid bounds of the text.
    #[error("{what} {value} is out of range (valid: {bound})")]
    OutOfRange {
        what: &'static str,
        value: String,
        bound: String,
    },

    /// A malformed argument, e.g. an overlapping or misordered change list.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// A required argument was absent.
    #[error("required argument `{0}` is missing")]
    NullInput(&'static str),

    /// Content looks binary and the caller asked for that to be rejected.
    #[error("content appears to be binary")]
    InvalidContent,

    /// Bytes that cannot be decoded under a strict encoding.
    #[error("byte sequence at offset {offset} cannot be decoded as {encoding}")]
    UnrepresentableSequence {
        encoding: &'static str,
        offset: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TextError {
    pub(crate) fn out_of_range(
        what: &'static str,
        value: impl std::fmt::Display,
        bound: impl std::fmt::Display,
    ) -> Self {
        TextError::OutOfRange {
            what,
            value: value.to_string(),
            bound: bound.to_string(),
        }
    }

    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        TextError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// True for [`TextError::OutOfRange`].
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, TextError::OutOfRange { .. })
    }

    /// True for [`TextError::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, TextError::InvalidArgument { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TextError::out_of_range("position", 12, "0..10");
        assert_eq!(err.to_string(), "position 12 is out of range (valid: 0..10)");
        assert!(err.is_out_of_range());

        let err = TextError::invalid_argument("changes", "changes overlap");
        assert_eq!(err.to_string(), "invalid argument `changes`: changes overlap");
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: TextError = io.into();
        assert!(matches!(err, TextError::Io(_)));
    }
}
