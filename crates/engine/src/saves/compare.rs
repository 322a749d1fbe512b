//! Local versus remote save comparison.

use crate::error::{ErrorKind, Result};
use crate::fsutil::{self, blocking};
use exn::ResultExt;
use romsync_remote::RemoteHandle;
use romsync_remote::models::RemoteSaveSnapshot;
use serde::Serialize;
use std::path::Path;
use time::OffsetDateTime;

/// Presence of local and remote saves for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveCheck {
    pub has_local: bool,
    pub has_cloud: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveComparison {
    /// At least one file exists in the persistent save directory.
    pub has_local: bool,
    /// The remote holds at least one snapshot.
    pub has_cloud: bool,
    /// Newest modification time across the persistent save files.
    #[serde(with = "time::serde::rfc3339::option")]
    pub local_modified_at: Option<OffsetDateTime>,
    /// Newest first.
    pub remote_snapshots: Vec<RemoteSaveSnapshot>,
}
impl SaveComparison {
    pub fn new(local_modified_at: Option<OffsetDateTime>, mut remote_snapshots: Vec<RemoteSaveSnapshot>) -> Self {
        remote_snapshots.sort_by_key(|s| std::cmp::Reverse(s.modified_at()));
        Self {
            has_local: local_modified_at.is_some(),
            has_cloud: !remote_snapshots.is_empty(),
            local_modified_at,
            remote_snapshots,
        }
    }

    pub fn newest_snapshot(&self) -> Option<&RemoteSaveSnapshot> {
        self.remote_snapshots.first()
    }

    pub fn snapshot(&self, id: u64) -> Option<&RemoteSaveSnapshot> {
        self.remote_snapshots.iter().find(|s| s.id == id)
    }

    pub fn check(&self) -> SaveCheck {
        SaveCheck { has_local: self.has_local, has_cloud: self.has_cloud }
    }

    /// Whether the caller has to pick: both sides hold saves, or the remote
    /// holds more than one snapshot to choose from.
    pub fn choice_required(&self) -> bool {
        (self.has_local && self.has_cloud) || self.remote_snapshots.len() > 1
    }
}

/// Which side looks more recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    Local,
    Cloud,
    Same,
    LocalOnly,
    CloudOnly,
    None,
}

/// Recommend a side. Only a strictly newer timestamp wins; a tie is
/// [`Recommendation::Same`].
pub fn recommend(comparison: &SaveComparison) -> Recommendation {
    let newest = comparison.newest_snapshot().map(RemoteSaveSnapshot::modified_at);
    match (comparison.local_modified_at, newest) {
        (Some(local), Some(remote)) if local > remote => Recommendation::Local,
        (Some(local), Some(remote)) if remote > local => Recommendation::Cloud,
        (Some(_), Some(_)) => Recommendation::Same,
        (Some(_), None) => Recommendation::LocalOnly,
        (None, Some(_)) => Recommendation::CloudOnly,
        (None, None) => Recommendation::None,
    }
}

/// Inspect the persistent save directory and the remote snapshot list.
pub async fn compare_saves(remote: &RemoteHandle, asset_id: u64, persistent_save_dir: &Path) -> Result<SaveComparison> {
    let dir = persistent_save_dir.to_path_buf();
    let local_modified_at =
        blocking(move || fsutil::latest_modified(&dir)).await.or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
    let snapshots = remote.list_save_snapshots(asset_id).await.or_raise(|| ErrorKind::SaveSyncFailed(asset_id))?;
    let comparison = SaveComparison::new(local_modified_at.map(OffsetDateTime::from), snapshots);
    tracing::debug!(
        asset_id,
        has_local = comparison.has_local,
        snapshots = comparison.remote_snapshots.len(),
        "Saves compared"
    );
    Ok(comparison)
}
