//! Remote Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A remote API error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The asset, file or snapshot does not exist on the server.
    #[display("not found on remote: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Connection dropped, timed out or never happened.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The server understood the request and refused it.
    #[display("rejected by remote: {_0}")]
    Rejected(#[error(not(source))] String),
    /// Reading a local file for upload failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("asset 7".to_string()).to_string(), "not found on remote: asset 7");
        assert_eq!(ErrorKind::Rejected("quota".to_string()).to_string(), "rejected by remote: quota");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Network("reset".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound(String::new()).is_retryable());
        assert!(!ErrorKind::Rejected(String::new()).is_retryable());
    }
}
