//! Integrity Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An integrity error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for hashing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read to completion. A digest computed from a
    /// partial read is worthless, so no verdict is produced.
    #[display("hash computation failed: {}", _0.display())]
    HashFailed(#[error(not(source))] PathBuf),
    /// The blocking hashing worker panicked or was cancelled.
    #[display("hashing worker did not complete")]
    Worker,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HashFailed(_))
    }
}
