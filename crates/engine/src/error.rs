//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the lower crates are
//! raised into one of these kinds with [`ResultExt::or_raise`](exn::ResultExt::or_raise),
//! so the full tree survives up to [`api`](crate::api).

use derive_more::{Display, Error};
use romsync_config::EmulatorKind;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
///
/// ### Fatal to a launch
/// - [`ErrorKind::NotConfigured`], [`ErrorKind::NoEmulatorForPlatform`]
/// - [`ErrorKind::DownloadFailed`], [`ErrorKind::IntegrityFailed`],
///   [`ErrorKind::ExtractionFailed`], [`ErrorKind::Cancelled`]
/// - [`ErrorKind::AlreadyRunning`], [`ErrorKind::Session`], [`ErrorKind::Launch`]
///
/// ### Logged and downgraded
/// - [`ErrorKind::SaveSyncFailed`] never prevents session cleanup.
/// - [`ErrorKind::ChoiceTimeout`] falls back to the local save.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable executable is set for this emulator.
    #[display("{_0} is not configured: set its executable path")]
    NotConfigured(#[error(not(source))] EmulatorKind),
    #[display("download failed for asset {_0}")]
    DownloadFailed(#[error(not(source))] u64),
    /// A raw payload did not match any declared hash.
    #[display("integrity check failed: {_0}")]
    IntegrityFailed(#[error(not(source))] String),
    /// A container could not be unpacked, or held nothing launchable.
    #[display("extraction failed for asset {_0}")]
    ExtractionFailed(#[error(not(source))] u64),
    #[display("no emulator configured for platform {_0}")]
    NoEmulatorForPlatform(#[error(not(source))] String),
    #[display("save synchronization failed for asset {_0}")]
    SaveSyncFailed(#[error(not(source))] u64),
    #[display("no save choice was made in time")]
    ChoiceTimeout,
    #[display("asset {_0} is already running")]
    AlreadyRunning(#[error(not(source))] u64),
    #[display("operation cancelled")]
    Cancelled,
    /// Files are locked by another process (usually a running emulator).
    #[display("{_0}")]
    InUse(#[error(not(source))] String),
    /// Preparing, mirroring or deleting a session directory failed.
    #[display("session error")]
    Session,
    /// The launch lifecycle was asked to move between incompatible states.
    #[display("invalid launch state transition: {_0}")]
    InvalidState(#[error(not(source))] String),
    #[display("asset registry error")]
    Registry,
    /// The emulator process could not be started.
    #[display("failed to launch {_0}")]
    Launch(#[error(not(source))] EmulatorKind),
    #[display("crash recovery failed")]
    Recovery,
    #[display("invalid configuration")]
    Configuration,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailed(_) | Self::SaveSyncFailed(_) | Self::Cancelled | Self::InUse(_) | Self::Registry
        )
    }
}
