use super::choice::SaveChoice;
use super::compare::SaveComparison;
use crate::adapter::{Adapter, SessionInfo};
use crate::error::{ErrorKind, Result};
use crate::fsutil::{self, blocking};
use exn::{OptionExt, ResultExt};
use romsync_remote::RemoteHandle;
use std::path::Path;
use tracing::instrument;

/// Materialize the chosen save state into a prepared session.
#[instrument(skip_all, fields(asset_id = asset_id, choice = ?choice))]
pub async fn apply_choice(
    adapter: &Adapter,
    remote: &RemoteHandle,
    asset_id: u64,
    choice: SaveChoice,
    info: &SessionInfo,
    comparison: &SaveComparison,
    persistent_save_dir: &Path,
) -> Result<()> {
    let save_root = adapter.locate_save_root(info);
    match choice {
        SaveChoice::Local => {
            let copied = adapter.prepare_saves(info, persistent_save_dir).await?;
            tracing::debug!(files = copied, "Local saves copied into session");
        },
        SaveChoice::Cloud(snapshot_id) => {
            let snapshot = comparison.snapshot(snapshot_id).ok_or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
            let data =
                remote.download_save_snapshot(snapshot).await.or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
            let extraction =
                romsync_archive::unpack(data, &save_root).await.or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
            tracing::debug!(snapshot_id, files = extraction.written.len(), "Remote snapshot unpacked into session");
        },
        SaveChoice::None => {
            blocking(move || fsutil::reset_dir(&save_root)).await.or_raise(|| ErrorKind::Session)?;
            tracing::debug!("Session save root cleared");
        },
    }
    Ok(())
}
