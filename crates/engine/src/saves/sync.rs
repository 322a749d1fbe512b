use crate::adapter::{Adapter, SessionInfo};
use crate::error::{ErrorKind, Result};
use crate::fsutil::{self, blocking};
use exn::ResultExt;
use romsync_remote::RemoteHandle;
use romsync_remote::models::RemoteSaveSnapshot;
use serde::Serialize;
use std::path::Path;
use tracing::instrument;

/// What happened to a session's saves after the emulator exited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncReport {
    /// The save root held no files; the remote was not contacted.
    NothingToSync,
    Synced {
        /// Files mirrored into the persistent save directory.
        files: Vec<String>,
        uploaded: Option<RemoteSaveSnapshot>,
        /// Why the upload failed, if it did. Local files are kept either way.
        upload_error: Option<String>,
    },
}
impl SyncReport {
    pub fn message(&self) -> String {
        match self {
            Self::NothingToSync => "no saves to upload".to_string(),
            Self::Synced { files, upload_error: None, .. } => format!("{} save file(s) synced", files.len()),
            Self::Synced { files, upload_error: Some(err), .. } => {
                format!("{} save file(s) kept locally; upload failed: {err}", files.len())
            },
        }
    }
}

/// Capture a finished session's saves: upload them, then mirror them into
/// the persistent save directory.
///
/// An upload failure is reported, not raised. Only a failure to write the
/// local mirror is an error.
#[instrument(skip_all, fields(asset_id = asset_id, emulator = %adapter.kind()))]
pub async fn sync_after_exit(
    adapter: &Adapter,
    remote: &RemoteHandle,
    asset_id: u64,
    info: &SessionInfo,
    persistent_save_dir: &Path,
) -> Result<SyncReport> {
    let save_root = adapter.locate_save_root(info);
    let root = save_root.clone();
    if !blocking(move || Ok(fsutil::has_files(&root))).await.or_raise(|| ErrorKind::SaveSyncFailed(asset_id))? {
        tracing::info!("No saves to upload");
        return Ok(SyncReport::NothingToSync);
    }

    let (uploaded, upload_error) = match upload(adapter, remote, asset_id, &save_root).await {
        Ok(snapshot) => {
            tracing::info!(snapshot_id = snapshot.id, size = snapshot.size, "Saves uploaded");
            (Some(snapshot), None)
        },
        Err(err) => {
            tracing::warn!(error = ?err, "Save upload failed; keeping saves locally");
            (None, Some((*err).to_string()))
        },
    };

    let files = adapter
        .extract_saves_from_session(&info.session_dir, persistent_save_dir)
        .await
        .or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
    tracing::info!(files = files.len(), "Saves mirrored locally");
    Ok(SyncReport::Synced { files, uploaded, upload_error })
}

async fn upload(adapter: &Adapter, remote: &RemoteHandle, asset_id: u64, save_root: &Path) -> Result<RemoteSaveSnapshot> {
    let staging = tempfile::tempdir().or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
    let archive = staging.path().join(format!("game_{asset_id}_{}.zip", adapter.key()));
    romsync_archive::pack_dir(save_root, &archive).await.or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
    remote.upload_save(asset_id, &archive, adapter.key()).await.or_raise(|| ErrorKind::SaveSyncFailed(asset_id))
}
