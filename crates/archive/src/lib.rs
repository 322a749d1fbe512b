//! Container handling for game assets and save archives.
//!
//! Two jobs share this crate:
//!
//! - **Asset containers**: a downloaded `*.zip` is unpacked in place next to
//!   itself ([`extract`]). Extraction is idempotent; members already on disk
//!   with the right size are skipped.
//! - **Save archives**: a session's save root is packed into a ZIP for upload
//!   ([`pack_dir`]) and remote snapshots are unpacked over a save root
//!   ([`unpack`]).
//!
//! All ZIP I/O is synchronous and runs inside
//! [`spawn_blocking`](tokio::task::spawn_blocking).

pub mod error;
mod ops;

pub use crate::ops::{Extraction, extract, pack_dir, unpack};
use std::path::Path;

/// A supported container format. Defaults to [`None`](Self::None) (not a
/// container).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Container {
    #[default]
    None,
    /// ZIP archive (.zip)
    Zip,
}
impl Container {
    /// Detect the container format from a file extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "zip" => Container::Zip,
                _ => Container::None,
            })
            .unwrap_or(Container::None)
    }

    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        !matches!(self, Container::None)
    }
}
