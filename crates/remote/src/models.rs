//! Remote data model.
//!
//! These types mirror what the content server reports. The engine treats
//! them as immutable: assets are refreshed wholesale and snapshots are only
//! ever added by uploading new ones.

use romsync_integrity::ExpectedHashes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One downloadable file belonging to a [`GameAsset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFile {
    /// File name as it should appear on disk (may contain `/` separators).
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Declared hashes; any subset may be missing.
    #[serde(flatten)]
    pub hashes: ExpectedHashes,
}
impl ContentFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), size, hashes: ExpectedHashes::default() }
    }

    pub fn with_hashes(mut self, hashes: ExpectedHashes) -> Self {
        self.hashes = hashes;
        self
    }
}

/// A game as identified by the remote server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAsset {
    pub id: u64,
    /// Platform slug, e.g. `psp` or `gamecube`.
    pub platform: String,
    pub name: String,
    pub files: Vec<ContentFile>,
    /// `false` when the asset is a single simple file.
    #[serde(default)]
    pub multi_file: bool,
}
impl GameAsset {
    /// Total declared size of every content file.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// One save-game upload stored on the server for an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSaveSnapshot {
    pub id: u64,
    pub file_name: String,
    /// Emulator key the save was produced by (e.g. `ppsspp`).
    pub emulator: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    /// Server-side path the snapshot is fetched from.
    pub download_path: String,
}
impl RemoteSaveSnapshot {
    /// The timestamp used for ordering: `updated_at`, else `created_at`.
    pub fn modified_at(&self) -> OffsetDateTime {
        self.updated_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_content_file_hashes_are_flattened() {
        let json = r#"{"name":"game.iso","size":11,"crc32":"0d4a1185"}"#;
        let file: ContentFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.hashes, ExpectedHashes::crc32("0d4a1185"));
        assert_eq!(file.hashes.md5, None);
    }

    #[test]
    fn test_asset_total_size() {
        let asset = GameAsset {
            id: 1,
            platform: "psp".to_string(),
            name: "Game".to_string(),
            files: vec![ContentFile::new("a.bin", 10), ContentFile::new("a.cue", 2)],
            multi_file: true,
        };
        assert_eq!(asset.total_size(), 12);
    }

    #[test]
    fn test_snapshot_modified_at_falls_back_to_created() {
        let json = r#"{
            "id": 3,
            "file_name": "save.zip",
            "emulator": "ppsspp",
            "size": 100,
            "created_at": "2025-01-01T10:00:00Z",
            "download_path": "/saves/3"
        }"#;
        let mut snapshot: RemoteSaveSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.modified_at(), datetime!(2025-01-01 10:00:00 UTC));
        snapshot.updated_at = Some(datetime!(2025-02-01 10:00:00 UTC));
        assert_eq!(snapshot.modified_at(), datetime!(2025-02-01 10:00:00 UTC));
    }
}
