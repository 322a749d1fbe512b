//! Contract between the engine and the remote content server.
//!
//! The transport itself lives outside this workspace; anything that can list
//! an asset's files, stream them, and store save snapshots can implement
//! [`RemoteApi`]. Enable the `mock` feature for the in-memory
//! [`MockRemote`] used by tests.

pub mod error;
#[cfg(feature = "mock")]
mod mock;
pub mod models;

use crate::error::Result;
#[cfg(feature = "mock")]
pub use crate::mock::{MockRemote, Operation};
use crate::models::{ContentFile, RemoteSaveSnapshot};
use async_trait::async_trait;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

/// Byte chunks of one content file, in order.
pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send + 'a>>;

pub type RemoteHandle = Arc<dyn RemoteApi + Send + Sync>;

/// Operations the engine needs from the content server.
///
/// # Examples
///
/// ```no_run
/// use futures::TryStreamExt;
/// use romsync_remote::{RemoteApi, error::Result};
///
/// async fn download_size(remote: &dyn RemoteApi, asset_id: u64) -> Result<usize> {
///     let mut total = 0;
///     for file in remote.list_files(asset_id).await? {
///         let mut chunks = remote.download_file(asset_id, &file);
///         while let Some(chunk) = chunks.try_next().await? {
///             total += chunk.len();
///         }
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Name of the remote (used for logging only).
    fn name(&self) -> &str;

    /// List the content files of an asset, with whatever hashes the server
    /// declares for them.
    async fn list_files(&self, asset_id: u64) -> Result<Vec<ContentFile>>;

    /// Stream one content file as byte chunks.
    ///
    /// Errors are yielded from the stream; a missing file yields a single
    /// [`NotFound`](crate::error::ErrorKind::NotFound).
    fn download_file<'a>(&'a self, asset_id: u64, file: &'a ContentFile) -> ChunkStream<'a>;

    /// List every save snapshot stored for an asset, in no particular order.
    async fn list_save_snapshots(&self, asset_id: u64) -> Result<Vec<RemoteSaveSnapshot>>;

    /// Fetch the ZIP bytes of one snapshot.
    async fn download_save_snapshot(&self, snapshot: &RemoteSaveSnapshot) -> Result<Vec<u8>>;

    /// Upload a packaged save archive tagged with the emulator that produced
    /// it, returning the snapshot the server created.
    async fn upload_save(&self, asset_id: u64, archive: &Path, emulator: &str) -> Result<RemoteSaveSnapshot>;
}
