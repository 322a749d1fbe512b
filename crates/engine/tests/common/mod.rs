#![allow(dead_code)]

use romsync_cache::Database;
use romsync_config::{Config, EmulatorKind, EmulatorSettings};
use romsync_engine::Engine;
use romsync_integrity::ExpectedHashes;
use romsync_remote::MockRemote;
use romsync_remote::models::{ContentFile, GameAsset, RemoteSaveSnapshot};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;

pub const HELLO: &[u8] = b"hello world";
pub const HELLO_CRC: &str = "0d4a1185";

pub struct Harness {
    pub dir: TempDir,
    pub remote: Arc<MockRemote>,
    pub engine: Engine,
}
impl Harness {
    /// An engine whose PPSSPP executable is a shell script. `body` receives
    /// the scratch directory so the script can leave traces there.
    pub async fn new(remote: MockRemote, body: impl FnOnce(&Path) -> String) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ppsspp_config(dir.path(), &body(dir.path()));
        Self::with_config(dir, remote, config).await
    }

    pub async fn with_config(dir: TempDir, remote: MockRemote, config: Config) -> Self {
        let remote = Arc::new(remote);
        let database = Database::connect_in_memory().await.unwrap();
        let engine = Engine::with_database(config, remote.clone(), &database);
        Self { dir, remote, engine }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

/// Data root under `dir`, with PPSSPP played by a script running `body`.
pub fn ppsspp_config(dir: &Path, body: &str) -> Config {
    let script = write_script(dir, "ppsspp.sh", body);
    Config::default()
        .with_data_root(dir.join("data"))
        .with_emulator(EmulatorKind::Ppsspp, EmulatorSettings::new(script.to_str().unwrap()))
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn touch(path: &Path, data: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

pub fn iso(crc32: &str) -> ContentFile {
    ContentFile::new("game.iso", HELLO.len() as u64).with_hashes(ExpectedHashes::crc32(crc32))
}

pub fn snapshot(id: u64, modified_unix: i64) -> RemoteSaveSnapshot {
    RemoteSaveSnapshot {
        id,
        file_name: format!("save_{id}.zip"),
        emulator: "ppsspp".to_string(),
        size: 0,
        created_at: OffsetDateTime::from_unix_timestamp(modified_unix).unwrap(),
        updated_at: None,
        download_path: format!("/saves/{id}"),
    }
}

pub fn psp_asset(id: u64, files: Vec<ContentFile>) -> GameAsset {
    GameAsset { id, platform: "psp".to_string(), name: format!("Game {id}"), files, multi_file: false }
}
