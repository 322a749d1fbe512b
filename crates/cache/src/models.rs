use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use romsync_remote::models::{ContentFile, GameAsset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// A [`GameAsset`] that has been downloaded into the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAsset {
    pub asset: GameAsset,
    /// Directory holding the asset's files.
    pub local_path: PathBuf,
    /// Every file on disk under `local_path`, relative to it.
    pub local_files: Vec<PathBuf>,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
}
impl LocalAsset {
    pub fn new(asset: GameAsset, local_path: impl Into<PathBuf>, local_files: Vec<PathBuf>) -> Self {
        Self { asset, local_path: local_path.into(), local_files, registered_at: OffsetDateTime::now_utc() }
    }

    pub fn id(&self) -> u64 {
        self.asset.id
    }

    /// Absolute path of a file inside the cache directory.
    pub fn path_of(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.local_path.join(relative)
    }

    /// Absolute paths of every file recorded on disk.
    pub fn absolute_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.local_files.iter().map(|f| self.local_path.join(f))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AssetRow {
    pub(crate) id: i64,
    pub(crate) platform: String,
    pub(crate) name: String,
    pub(crate) multi_file: bool,
    pub(crate) files: String,
    pub(crate) local_path: String,
    pub(crate) local_files: String,
    pub(crate) registered_at: i64,
}
impl TryFrom<&LocalAsset> for AssetRow {
    type Error = Error;
    fn try_from(local: &LocalAsset) -> Result<Self, Self::Error> {
        let local_files = local
            .local_files
            .iter()
            .map(|p| p.to_str().map(str::to_string).ok_or_raise(|| ErrorKind::InvalidData("local file path")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: i64::try_from(local.asset.id).or_raise(|| ErrorKind::InvalidData("asset id"))?,
            platform: local.asset.platform.clone(),
            name: local.asset.name.clone(),
            multi_file: local.asset.multi_file,
            files: serde_json::to_string(&local.asset.files).or_raise(|| ErrorKind::InvalidData("content files"))?,
            local_path: local.local_path.to_str().ok_or_raise(|| ErrorKind::InvalidData("local path"))?.to_string(),
            local_files: serde_json::to_string(&local_files).or_raise(|| ErrorKind::InvalidData("local files"))?,
            registered_at: local.registered_at.unix_timestamp(),
        })
    }
}
impl TryFrom<AssetRow> for LocalAsset {
    type Error = Error;
    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        let files: Vec<ContentFile> =
            serde_json::from_str(&row.files).or_raise(|| ErrorKind::InvalidData("content files"))?;
        let local_files: Vec<PathBuf> =
            serde_json::from_str(&row.local_files).or_raise(|| ErrorKind::InvalidData("local files"))?;
        Ok(Self {
            asset: GameAsset {
                id: u64::try_from(row.id).or_raise(|| ErrorKind::InvalidData("asset id"))?,
                platform: row.platform,
                name: row.name,
                files,
                multi_file: row.multi_file,
            },
            local_path: PathBuf::from(row.local_path),
            local_files,
            registered_at: OffsetDateTime::from_unix_timestamp(row.registered_at)
                .or_raise(|| ErrorKind::InvalidData("registration date"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romsync_integrity::ExpectedHashes;

    fn local() -> LocalAsset {
        let asset = GameAsset {
            id: 7,
            platform: "psp".to_string(),
            name: "Test Game".to_string(),
            files: vec![ContentFile::new("game.iso", 11).with_hashes(ExpectedHashes::crc32("0d4a1185"))],
            multi_file: false,
        };
        LocalAsset::new(asset, "/data/roms/psp/game_7", vec![PathBuf::from("game.iso")])
    }

    #[test]
    fn test_model_to_row_and_back() {
        let model = local();
        let row = AssetRow::try_from(&model).unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.local_files, r#"["game.iso"]"#);
        let back = LocalAsset::try_from(row).unwrap();
        assert_eq!(back.asset, model.asset);
        assert_eq!(back.local_files, model.local_files);
        // Unix timestamps drop the sub-second component.
        assert_eq!(back.registered_at, model.registered_at.replace_nanosecond(0).unwrap());
    }

    #[test]
    fn test_corrupt_row() {
        let mut row = AssetRow::try_from(&local()).unwrap();
        row.files = "not json".to_string();
        let err = LocalAsset::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("content files")));
    }

    #[test]
    fn test_absolute_files() {
        let model = local();
        let files: Vec<_> = model.absolute_files().collect();
        assert_eq!(files, vec![PathBuf::from("/data/roms/psp/game_7/game.iso")]);
    }
}
