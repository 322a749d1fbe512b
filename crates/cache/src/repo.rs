//! Repository for [`LocalAsset`] records.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{AssetRow, LocalAsset};
use exn::ResultExt;
use sqlx::SqlitePool;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Register an asset, replacing any previous record with the same id.
    #[instrument(skip_all, fields(asset_id = local.id()))]
    pub async fn upsert(&self, local: &LocalAsset) -> Result<()> {
        let row = AssetRow::try_from(local)?;
        sqlx::query(include_str!("../queries/upsert_asset.sql"))
            .bind(row.id)
            .bind(row.platform)
            .bind(row.name)
            .bind(row.multi_file)
            .bind(row.files)
            .bind(row.local_path)
            .bind(row.local_files)
            .bind(row.registered_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!("Asset registered");
        Ok(())
    }

    pub async fn get(&self, id: u64) -> Result<Option<LocalAsset>> {
        let row: Option<AssetRow> = sqlx::query_as(include_str!("../queries/get_asset.sql"))
            .bind(Self::id(id)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(LocalAsset::try_from).transpose()
    }

    /// Remove an asset's record. Returns `false` if nothing was registered.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(Self::id(id)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    fn id(id: u64) -> Result<i64> {
        i64::try_from(id).or_raise(|| ErrorKind::InvalidData("asset id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romsync_remote::models::{ContentFile, GameAsset};
    use std::path::PathBuf;

    fn asset(id: u64, platform: &str) -> LocalAsset {
        let asset = GameAsset {
            id,
            platform: platform.to_string(),
            name: format!("Game {id}"),
            files: vec![ContentFile::new("game.zip", 100)],
            multi_file: false,
        };
        LocalAsset::new(
            asset,
            format!("/data/roms/{platform}/game_{id}"),
            vec![PathBuf::from("game.zip"), PathBuf::from("disc/game.iso")],
        )
    }

    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = repo().await;
        assert!(repo.get(7).await.unwrap().is_none());
        repo.upsert(&asset(7, "psp")).await.unwrap();
        let found = repo.get(7).await.unwrap().unwrap();
        assert_eq!(found.asset.name, "Game 7");
        assert_eq!(found.local_files.len(), 2);
        assert_eq!(found.path_of("disc/game.iso"), PathBuf::from("/data/roms/psp/game_7/disc/game.iso"));
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let repo = repo().await;
        repo.upsert(&asset(7, "psp")).await.unwrap();
        let mut updated = asset(7, "psp");
        updated.local_files = vec![PathBuf::from("game.iso")];
        repo.upsert(&updated).await.unwrap();
        assert_eq!(repo.get(7).await.unwrap().unwrap().local_files, vec![PathBuf::from("game.iso")]);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo().await;
        repo.upsert(&asset(7, "psp")).await.unwrap();
        assert!(repo.delete(7).await.unwrap());
        assert!(!repo.delete(7).await.unwrap());
        assert!(repo.get(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_id_out_of_range() {
        let repo = repo().await;
        let err = repo.get(u64::MAX).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(_)));
    }
}
