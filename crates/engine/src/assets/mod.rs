//! Asset cache manager.
//!
//! Guarantees a launchable copy of an asset exists under
//! `roms/<platform>/game_<id>/`:
//!
//! 1. A registered asset is re-verified against its declared hashes. If it
//!    still passes, nothing is downloaded.
//! 2. Otherwise every declared file is streamed from the remote, then
//!    verified, then any ZIP containers are unpacked in place.
//! 3. Only a fully prepared directory is registered.
//!
//! Verification is asymmetric (see [`FileClass`]): a container that fails
//! its hash check is logged and used anyway, a raw payload that fails is
//! refused and its directory deleted.

mod policy;
mod progress;

pub use self::policy::{FileClass, RAW_EXTENSIONS};
pub use self::progress::{Progress, ProgressSink};
use crate::error::{ErrorKind, Result};
use crate::fsutil::{self, blocking};
use crate::layout::Layout;
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use romsync_cache::{LocalAsset, Repository};
use romsync_integrity::Verdict;
use romsync_remote::RemoteHandle;
use romsync_remote::models::{ContentFile, GameAsset};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Outcome of hashing one declared file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileCheck {
    /// At least one declared hash matched.
    Verified,
    /// Nothing was declared to compare against.
    Unverifiable,
    Mismatch(Verdict),
}

#[derive(Clone)]
pub struct AssetCache {
    layout: Layout,
    remote: RemoteHandle,
    registry: Repository,
    chunk_size: usize,
}

impl AssetCache {
    pub fn new(layout: Layout, remote: RemoteHandle, registry: Repository, chunk_size: usize) -> Self {
        Self { layout, remote, registry, chunk_size }
    }

    /// Make sure a valid local copy of `asset` exists, downloading it if needed.
    #[instrument(skip_all, fields(asset_id = asset.id, platform = %asset.platform))]
    pub async fn ensure_available(
        &self,
        asset: &GameAsset,
        progress: &ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<LocalAsset> {
        if let Some(local) = self.registry.get(asset.id).await.or_raise(|| ErrorKind::Registry)? {
            let unchanged = asset.files.is_empty() || local.asset.files == asset.files;
            if unchanged && self.verify_cached(&local).await? {
                tracing::info!("Asset already available");
                progress.emit(Progress::already_available(asset.id));
                return Ok(local);
            }
            tracing::warn!(path = %local.local_path.display(), "Cached asset is stale; downloading again");
            self.forget(&local).await?;
        }
        self.download(asset, progress, cancel).await
    }

    /// Re-verify a registered asset with the same per-class policy used after
    /// a download. A declared, non-ignored file missing from disk fails.
    ///
    /// Container members that went missing or were truncated since the last
    /// extraction are extracted again; any other recorded file that is gone
    /// fails verification.
    #[instrument(skip_all, fields(asset_id = local.id()))]
    pub async fn verify_cached(&self, local: &LocalAsset) -> Result<bool> {
        if !local.local_path.is_dir() {
            return Ok(false);
        }
        for file in &local.asset.files {
            let class = FileClass::of(&file.name);
            if !class.is_verified() {
                continue;
            }
            let path = local.path_of(&file.name);
            if !path.is_file() {
                tracing::info!(path = %path.display(), "Declared file is missing from the cache");
                return Ok(false);
            }
            match self.check_file(&path, file).await {
                Ok(FileCheck::Mismatch(_)) if class == FileClass::Raw => return Ok(false),
                Ok(FileCheck::Mismatch(_)) => {
                    tracing::warn!(path = %path.display(), "Container hash mismatch; keeping cached copy");
                },
                Ok(_) => {},
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = ?err, "Cached file could not be hashed");
                    return Ok(false);
                },
            }
        }

        for file in local.asset.files.iter().filter(|f| FileClass::of(&f.name) == FileClass::Container) {
            match romsync_archive::extract(local.path_of(&file.name), &local.local_path).await {
                Ok(extraction) if extraction.is_noop() => {},
                Ok(extraction) => {
                    tracing::info!(file = %file.name, restored = extraction.written.len(), "Restored extracted files");
                },
                Err(err) => {
                    tracing::warn!(file = %file.name, error = ?err, "Cached container could not be re-extracted");
                    return Ok(false);
                },
            }
        }
        if let Some(missing) = local.absolute_files().find(|path| !path.is_file()) {
            tracing::info!(path = %missing.display(), "Recorded file is missing from the cache");
            return Ok(false);
        }
        Ok(true)
    }

    /// Remove an asset's cache directory and its registry entry. Returns
    /// `false` if the asset was not cached.
    #[instrument(skip_all, fields(asset_id = id))]
    pub async fn delete_cached(&self, id: u64) -> Result<bool> {
        let Some(local) = self.registry.get(id).await.or_raise(|| ErrorKind::Registry)? else {
            return Ok(false);
        };
        self.forget(&local).await?;
        tracing::info!(path = %local.local_path.display(), "Cached asset deleted");
        Ok(true)
    }

    /// Pick the file to hand to the emulator: the first playlist, else the
    /// first cue sheet, else the first other raw payload.
    pub fn find_payload(local: &LocalAsset) -> Result<PathBuf> {
        let relative = local
            .local_files
            .iter()
            .filter(|f| FileClass::of(f) == FileClass::Raw)
            .min_by_key(|f| policy::payload_priority(f))
            .ok_or_raise(|| ErrorKind::ExtractionFailed(local.id()))?;
        Ok(local.path_of(relative))
    }

    async fn forget(&self, local: &LocalAsset) -> Result<()> {
        let path = local.local_path.clone();
        if let Err(err) = blocking(move || fsutil::remove_path(&path)).await {
            if is_in_use(&err) {
                let message = format!(
                    "{} is in use by another program; close the emulator and try again",
                    local.local_path.display()
                );
                return Err(err).or_raise(|| ErrorKind::InUse(message));
            }
            return Err(err).or_raise(|| ErrorKind::Session);
        }
        self.registry.delete(local.id()).await.or_raise(|| ErrorKind::Registry)?;
        Ok(())
    }

    async fn download(
        &self,
        asset: &GameAsset,
        progress: &ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<LocalAsset> {
        let files = if asset.files.is_empty() {
            self.remote.list_files(asset.id).await.or_raise(|| ErrorKind::DownloadFailed(asset.id))?
        } else {
            asset.files.clone()
        };
        let dir = self.layout.rom_dir(&asset.platform, asset.id);
        let local_files = match self.populate(asset.id, &files, &dir, progress, cancel).await {
            Ok(local_files) => local_files,
            Err(err) => {
                // No partial cache state may survive a failed download.
                let cleanup = dir.clone();
                if let Err(cleanup_err) = blocking(move || fsutil::remove_path(&cleanup)).await {
                    tracing::warn!(path = %dir.display(), error = %cleanup_err, "Failed to remove partial download");
                }
                return Err(err);
            },
        };
        let local = LocalAsset::new(GameAsset { files, ..asset.clone() }, dir, local_files);
        self.registry.upsert(&local).await.or_raise(|| ErrorKind::Registry)?;
        tracing::info!(files = local.local_files.len(), "Asset downloaded and registered");
        Ok(local)
    }

    /// Download, verify and unpack into `dir`. Returns the files on disk.
    async fn populate(
        &self,
        asset_id: u64,
        files: &[ContentFile],
        dir: &Path,
        progress: &ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await.or_raise(|| ErrorKind::DownloadFailed(asset_id))?;
        let total: u64 = files.iter().map(|f| f.size).sum();
        let mut downloaded = 0;
        for file in files {
            let relative = safe_relative(&file.name).ok_or_raise(|| ErrorKind::DownloadFailed(asset_id))?;
            let target = dir.join(relative);
            downloaded += self.download_file(asset_id, file, &target, (downloaded, total), progress, cancel).await?;
        }

        for file in files {
            let class = FileClass::of(&file.name);
            if !class.is_verified() {
                continue;
            }
            let path = dir.join(&file.name);
            let check = self.check_file(&path, file).await.or_raise(|| ErrorKind::IntegrityFailed(file.name.clone()))?;
            match (check, class) {
                (FileCheck::Verified, _) => tracing::debug!(file = %file.name, "Integrity verified"),
                (FileCheck::Unverifiable, _) => {
                    tracing::debug!(file = %file.name, "No declared hash; accepting unverified");
                },
                (FileCheck::Mismatch(_), FileClass::Container) => {
                    tracing::warn!(file = %file.name, "Container hash mismatch; continuing with extracted contents");
                },
                (FileCheck::Mismatch(verdict), _) => {
                    for (algorithm, check) in verdict.checks().filter(|(_, c)| c.expected.is_some()) {
                        tracing::debug!(algorithm, expected = ?check.expected, actual = %check.actual, "Hash mismatch");
                    }
                    exn::bail!(ErrorKind::IntegrityFailed(format!("{}: no declared hash matches", file.name)));
                },
            }
        }

        for file in files.iter().filter(|f| FileClass::of(&f.name) == FileClass::Container) {
            let extraction =
                romsync_archive::extract(dir.join(&file.name), dir).await.or_raise(|| ErrorKind::ExtractionFailed(asset_id))?;
            tracing::debug!(file = %file.name, written = extraction.written.len(), "Container extracted");
        }

        progress.emit(Progress::complete(asset_id, downloaded));
        let dir = dir.to_path_buf();
        blocking(move || fsutil::list_files(&dir)).await.or_raise(|| ErrorKind::DownloadFailed(asset_id))
    }

    /// Stream one file to disk. Returns the number of bytes written.
    async fn download_file(
        &self,
        asset_id: u64,
        file: &ContentFile,
        target: &Path,
        (already, total): (u64, u64),
        progress: &ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<u64> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::DownloadFailed(asset_id))?;
        }
        let mut output = tokio::fs::File::create(target).await.or_raise(|| ErrorKind::DownloadFailed(asset_id))?;
        let mut chunks = self.remote.download_file(asset_id, file);
        let mut written = 0;
        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                tracing::info!(file = %file.name, "Download cancelled");
                exn::bail!(ErrorKind::Cancelled);
            }
            let Some(chunk) = chunks.next().await else { break };
            let chunk = chunk.or_raise(|| ErrorKind::DownloadFailed(asset_id))?;
            output.write_all(&chunk).await.or_raise(|| ErrorKind::DownloadFailed(asset_id))?;
            written += chunk.len() as u64;
            progress.emit(Progress::downloading(asset_id, &file.name, already + written, total));
        }
        output.flush().await.or_raise(|| ErrorKind::DownloadFailed(asset_id))?;
        Ok(written)
    }

    async fn check_file(&self, path: &Path, file: &ContentFile) -> romsync_integrity::error::Result<FileCheck> {
        if file.hashes.is_empty() {
            return Ok(FileCheck::Unverifiable);
        }
        let verdict = romsync_integrity::verify(path, &file.hashes, self.chunk_size).await?;
        Ok(if verdict.valid { FileCheck::Verified } else { FileCheck::Mismatch(verdict) })
    }
}

// Remote file names become paths under the cache directory; only plain
// relative components are allowed.
fn safe_relative(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let safe = path.components().all(|c| matches!(c, Component::Normal(_)));
    (safe && !name.is_empty()).then(|| path.to_path_buf())
}

fn is_in_use(err: &io::Error) -> bool {
    if matches!(err.kind(), io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy) {
        return true;
    }
    // ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION.
    cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33))
}
