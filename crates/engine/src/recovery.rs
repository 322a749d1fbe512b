//! Crash recovery.
//!
//! A session directory still on disk at startup belongs to a run that never
//! reached cleanup. Its saves are folded back into persistent storage before
//! anything else may launch.

use crate::adapter::Adapter;
use crate::error::{ErrorKind, Result};
use crate::fsutil::{self, blocking};
use crate::layout::Layout;
use exn::ResultExt;
use regex::Regex;
use romsync_config::Config;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::instrument;

static SESSION_DIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^game_(\d+)_session$").unwrap());

/// An abandoned session found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedSession {
    pub platform: String,
    pub asset_id: u64,
    pub path: PathBuf,
}

/// Every `saves/<platform>/game_<id>_session` directory, in name order.
pub fn find_orphaned_sessions(layout: &Layout) -> Result<Vec<OrphanedSession>> {
    let saves_root = layout.saves_root();
    if !saves_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for platform in sorted_dirs(&saves_root)? {
        let Some(platform_name) = platform.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        for session in sorted_dirs(&platform)? {
            let Some(asset_id) = session
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| SESSION_DIR.captures(n))
                .and_then(|c| c[1].parse().ok())
            else {
                continue;
            };
            found.push(OrphanedSession { platform: platform_name.clone(), asset_id, path: session });
        }
    }
    Ok(found)
}

/// Recover every orphaned session. Returns how many were folded back.
///
/// A session is deleted only after its saves were extracted. Sessions
/// without save files are left alone, and a failing session never stops the
/// scan. Sessions of assets listed in `active` belong to a running launch
/// and are not touched.
#[instrument(skip_all)]
pub async fn recover_orphaned_saves(config: &Config, layout: &Layout, active: &HashSet<u64>) -> Result<usize> {
    let scan = layout.clone();
    let orphans =
        tokio::task::spawn_blocking(move || find_orphaned_sessions(&scan)).await.or_raise(|| ErrorKind::Recovery)??;
    let mut recovered = 0;
    for orphan in orphans {
        if active.contains(&orphan.asset_id) {
            tracing::debug!(asset_id = orphan.asset_id, "Session belongs to a running launch; skipped");
            continue;
        }
        match recover_session(config, layout, &orphan).await {
            Ok(true) => recovered += 1,
            Ok(false) => {
                tracing::debug!(path = %orphan.path.display(), "Orphaned session holds no saves; skipped");
            },
            Err(err) => {
                tracing::warn!(path = %orphan.path.display(), error = ?err, "Failed to recover orphaned session");
            },
        }
    }
    if recovered > 0 {
        tracing::info!(recovered, "Recovered saves from orphaned sessions");
    }
    Ok(recovered)
}

async fn recover_session(config: &Config, layout: &Layout, orphan: &OrphanedSession) -> Result<bool> {
    let adapter = Adapter::for_platform_or_generic(config, &orphan.platform);
    let persistent = layout.save_dir(&orphan.platform, orphan.asset_id);
    let files = adapter.extract_saves_from_session(&orphan.path, &persistent).await?;
    if files.is_empty() {
        return Ok(false);
    }
    let session = orphan.path.clone();
    blocking(move || fsutil::remove_path(&session)).await.or_raise(|| ErrorKind::Session)?;
    tracing::info!(asset_id = orphan.asset_id, platform = %orphan.platform, files = files.len(), "Session recovered");
    Ok(true)
}

fn sorted_dirs(parent: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(parent).or_raise(|| ErrorKind::Recovery)? {
        let entry = entry.or_raise(|| ErrorKind::Recovery)?;
        if entry.file_type().or_raise(|| ErrorKind::Recovery)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, data: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_find_orphaned_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        fs::create_dir_all(layout.session_dir("psp", 42)).unwrap();
        fs::create_dir_all(layout.session_dir("ps2", 7)).unwrap();
        fs::create_dir_all(layout.save_dir("psp", 42)).unwrap();
        fs::create_dir_all(layout.saves_root().join("psp/game_x_session")).unwrap();
        touch(&layout.saves_root().join("psp/game_9_session"), b"a file, not a directory");

        let found = find_orphaned_sessions(&layout).unwrap();
        let ids: Vec<(&str, u64)> = found.iter().map(|o| (o.platform.as_str(), o.asset_id)).collect();
        assert_eq!(ids, vec![("ps2", 7), ("psp", 42)]);
    }

    #[tokio::test]
    async fn test_generic_fallback_flattens() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let session = layout.session_dir("snes", 5);
        touch(&session.join("nested/deeper/game.srm"), b"sram");

        let recovered = recover_orphaned_saves(&Config::default(), &layout, &HashSet::new()).await.unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(fs::read(layout.save_dir("snes", 5).join("game.srm")).unwrap(), b"sram");
        assert!(!session.exists());
    }

    #[tokio::test]
    async fn test_empty_session_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let session = layout.session_dir("psp", 3);
        touch(&session.join("memstick/PSP/SYSTEM/ppsspp.ini"), b"[General]\n");
        fs::create_dir_all(session.join("memstick/PSP/SAVEDATA")).unwrap();

        assert_eq!(recover_orphaned_saves(&Config::default(), &layout, &HashSet::new()).await.unwrap(), 0);
        assert!(session.exists(), "sessions without saves are left in place");
        assert!(!layout.save_dir("psp", 3).exists());
    }

    #[tokio::test]
    async fn test_active_sessions_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let session = layout.session_dir("psp", 8);
        touch(&session.join("memstick/PSP/SAVEDATA/ULUS00001/DATA.BIN"), b"live");

        let active = HashSet::from([8]);
        assert_eq!(recover_orphaned_saves(&Config::default(), &layout, &active).await.unwrap(), 0);
        assert!(session.exists());
    }

    #[tokio::test]
    async fn test_missing_saves_root() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("nowhere"));
        assert_eq!(recover_orphaned_saves(&Config::default(), &layout, &HashSet::new()).await.unwrap(), 0);
    }
}
