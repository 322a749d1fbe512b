//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested config file does not exist.
    #[display("config file not found: {}", _0.display())]
    Missing(#[error(not(source))] PathBuf),
    /// The config file extension is not one of yaml, yml, toml or json.
    #[display("unsupported config format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A provider failed to parse, or values had the wrong type.
    #[display("could not load configuration")]
    Load,
    /// Values parsed but make no sense together.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    #[display("unknown emulator: {_0}")]
    UnknownEmulator(#[error(not(source))] String),
}

impl ErrorKind {
    /// Configuration problems need a human; retrying never helps.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
