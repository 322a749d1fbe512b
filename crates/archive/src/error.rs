//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Archive is corrupt or not a ZIP at all. Don't retry with the same input.
    #[display("invalid or corrupted archive")]
    InvalidData,
    /// An entry would be written outside the destination directory.
    #[display("archive entry escapes destination: {_0}")]
    UnsafeEntry(#[error(not(source))] String),
    /// Reading the source or writing the destination failed.
    #[display("I/O error")]
    Io,
    /// The blocking archive worker panicked or was cancelled.
    #[display("archive worker did not complete")]
    Worker,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::Worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidData.to_string(), "invalid or corrupted archive");
        assert_eq!(
            ErrorKind::UnsafeEntry("../evil".to_string()).to_string(),
            "archive entry escapes destination: ../evil"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::InvalidData.is_retryable());
        assert!(!ErrorKind::UnsafeEntry(String::new()).is_retryable());
        assert!(ErrorKind::Io.is_retryable());
    }
}
