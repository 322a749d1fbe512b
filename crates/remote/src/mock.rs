//! In-memory remote for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{ContentFile, RemoteSaveSnapshot};
use crate::{ChunkStream, RemoteApi};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use time::OffsetDateTime;
use tokio::sync::RwLock;

const DEFAULT_CHUNK: usize = 64 * 1024;

/// A [`RemoteApi`] operation, for request accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ListFiles,
    DownloadFile,
    ListSaveSnapshots,
    DownloadSaveSnapshot,
    UploadSave,
}
impl Operation {
    const ALL: [Operation; 5] = [
        Operation::ListFiles,
        Operation::DownloadFile,
        Operation::ListSaveSnapshots,
        Operation::DownloadSaveSnapshot,
        Operation::UploadSave,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

type Snapshots = HashMap<u64, Vec<(RemoteSaveSnapshot, Vec<u8>)>>;

/// In-memory remote for testing.
///
/// Content files and snapshots live in maps behind a [`RwLock`], so every
/// trait method works on `&self`. Each call is counted per [`Operation`],
/// including calls that fail.
///
/// # Examples
///
/// ```
/// use romsync_remote::{MockRemote, Operation, RemoteApi, models::ContentFile};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let remote = MockRemote::default().with_file(7, ContentFile::new("game.iso", 4), b"data");
/// assert_eq!(remote.list_files(7).await?.len(), 1);
/// assert_eq!(remote.requests(Operation::ListFiles), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockRemote {
    name: String,
    chunk_size: usize,
    files: RwLock<HashMap<u64, Vec<(ContentFile, Vec<u8>)>>>,
    snapshots: RwLock<Snapshots>,
    requests: [AtomicUsize; 5],
    fail_uploads: AtomicBool,
    next_snapshot_id: AtomicU64,
}

impl MockRemote {
    /// Add a content file to an asset.
    pub fn with_file(mut self, asset_id: u64, file: ContentFile, data: impl Into<Vec<u8>>) -> Self {
        self.files.get_mut().entry(asset_id).or_default().push((file, data.into()));
        self
    }

    /// Add an existing save snapshot to an asset.
    pub fn with_snapshot(mut self, asset_id: u64, snapshot: RemoteSaveSnapshot, data: impl Into<Vec<u8>>) -> Self {
        self.next_snapshot_id.fetch_max(snapshot.id + 1, Ordering::SeqCst);
        self.snapshots.get_mut().entry(asset_id).or_default().push((snapshot, data.into()));
        self
    }

    /// Change the chunk size used when streaming content files.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Make every subsequent upload fail with a network error.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Number of calls made to one operation.
    pub fn requests(&self, operation: Operation) -> usize {
        self.requests[operation.index()].load(Ordering::SeqCst)
    }

    /// Number of calls made to any operation.
    pub fn total_requests(&self) -> usize {
        Operation::ALL.iter().map(|op| self.requests(*op)).sum()
    }

    /// Snapshots currently stored for an asset, including uploaded ones.
    pub async fn snapshots(&self, asset_id: u64) -> Vec<RemoteSaveSnapshot> {
        let guard = self.snapshots.read().await;
        guard.get(&asset_id).map(|s| s.iter().map(|(snapshot, _)| snapshot.clone()).collect()).unwrap_or_default()
    }

    /// Raw bytes of a stored snapshot.
    pub async fn snapshot_data(&self, snapshot_id: u64) -> Option<Vec<u8>> {
        let guard = self.snapshots.read().await;
        guard.values().flatten().find(|(snapshot, _)| snapshot.id == snapshot_id).map(|(_, data)| data.clone())
    }

    fn count(&self, operation: Operation) {
        self.requests[operation.index()].fetch_add(1, Ordering::SeqCst);
    }
}
impl Default for MockRemote {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            chunk_size: DEFAULT_CHUNK,
            files: RwLock::default(),
            snapshots: RwLock::default(),
            requests: Default::default(),
            fail_uploads: AtomicBool::new(false),
            next_snapshot_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_files(&self, asset_id: u64) -> Result<Vec<ContentFile>> {
        self.count(Operation::ListFiles);
        let guard = self.files.read().await;
        let files = guard.get(&asset_id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(format!("asset {asset_id}"))))?;
        Ok(files.iter().map(|(file, _)| file.clone()).collect())
    }

    fn download_file<'a>(&'a self, asset_id: u64, file: &'a ContentFile) -> ChunkStream<'a> {
        self.count(Operation::DownloadFile);
        Box::pin(stream! {
            // Copy the data out so the lock is not held across yield points.
            let data = {
                let guard = self.files.read().await;
                guard
                    .get(&asset_id)
                    .and_then(|files| files.iter().find(|(f, _)| f.name == file.name))
                    .map(|(_, data)| data.clone())
            };
            let Some(data) = data else {
                yield Err(exn::Exn::from(ErrorKind::NotFound(format!("asset {asset_id} file {}", file.name))));
                return;
            };
            for chunk in data.chunks(self.chunk_size) {
                yield Ok(chunk.to_vec());
            }
        })
    }

    async fn list_save_snapshots(&self, asset_id: u64) -> Result<Vec<RemoteSaveSnapshot>> {
        self.count(Operation::ListSaveSnapshots);
        Ok(self.snapshots(asset_id).await)
    }

    async fn download_save_snapshot(&self, snapshot: &RemoteSaveSnapshot) -> Result<Vec<u8>> {
        self.count(Operation::DownloadSaveSnapshot);
        self.snapshot_data(snapshot.id)
            .await
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(format!("snapshot {}", snapshot.id))))
    }

    async fn upload_save(&self, asset_id: u64, archive: &Path, emulator: &str) -> Result<RemoteSaveSnapshot> {
        self.count(Operation::UploadSave);
        if self.fail_uploads.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Network("upload refused by mock".to_string()));
        }
        let data = tokio::fs::read(archive).await.or_raise(|| ErrorKind::Io)?;
        let id = self.next_snapshot_id.fetch_add(1, Ordering::SeqCst);
        let file_name = archive.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let snapshot = RemoteSaveSnapshot {
            id,
            file_name,
            emulator: emulator.to_string(),
            size: data.len() as u64,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            download_path: format!("/saves/{asset_id}/{id}"),
        };
        self.snapshots.write().await.entry(asset_id).or_default().push((snapshot.clone(), data));
        Ok(snapshot)
    }
}
