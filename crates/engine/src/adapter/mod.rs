//! Emulator adapters.
//!
//! An [`Adapter`] pairs one [`EmulatorKind`] with its [`EmulatorSettings`]
//! and knows, per family, where saves live inside a session, which config
//! file to patch, and how to start the process. The families are a closed
//! set dispatched with `match`:
//!
//! | Kind               | Save subtree            | Config file merged               |
//! |--------------------|-------------------------|----------------------------------|
//! | PPSSPP             | `memstick/PSP/SAVEDATA` | `memstick/PSP/SYSTEM/ppsspp.ini` |
//! | Dolphin (GameCube) | `GC`                    | `Config/Dolphin.ini`             |
//! | Dolphin (Wii)      | `Wii/title`             | `Config/Dolphin.ini`             |
//! | PCSX2              | `memcards`              | `inis/PCSX2.ini`                 |
//! | Generic            | the whole session       | none                             |
//!
//! Generic sessions are flattened when extracted: every file is copied into
//! the persistent save directory by file name alone.

mod command;
mod dolphin;
mod ini;
mod pcsx2;
mod ppsspp;

pub use self::dolphin::{DolphinVariant, WII_SIZE_THRESHOLD};
use self::ini::IniSetting;
use crate::error::{ErrorKind, Result};
use crate::fsutil::{self, blocking};
use exn::ResultExt;
use romsync_config::{Config, EmulatorKind, EmulatorSettings};
use romsync_remote::models::GameAsset;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::instrument;

/// Where one prepared session lives and where its saves go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub emulator: EmulatorKind,
    pub variant: Option<DolphinVariant>,
    pub session_dir: PathBuf,
    /// Relative to `session_dir`; empty for the Generic family.
    pub save_subtree: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Adapter {
    kind: EmulatorKind,
    settings: EmulatorSettings,
}

impl Adapter {
    pub fn new(kind: EmulatorKind, settings: EmulatorSettings) -> Self {
        Self { kind, settings }
    }

    /// The adapter configured for a platform slug.
    pub fn for_platform(config: &Config, platform: &str) -> Result<Self> {
        let Some(kind) = config.emulator_for_platform(platform) else {
            exn::bail!(ErrorKind::NoEmulatorForPlatform(platform.to_string()));
        };
        Ok(Self::new(kind, config.emulator(kind)))
    }

    /// Like [`for_platform`](Self::for_platform), but unknown platforms fall
    /// back to the Generic family.
    pub fn for_platform_or_generic(config: &Config, platform: &str) -> Self {
        let kind = config.emulator_for_platform(platform).unwrap_or(EmulatorKind::Generic);
        Self::new(kind, config.emulator(kind))
    }

    pub fn kind(&self) -> EmulatorKind {
        self.kind
    }

    /// Key used for upload tags and `emulatorConfigs/<key>/`.
    pub fn key(&self) -> &'static str {
        self.kind.key()
    }

    /// Resolve the executable, failing with
    /// [`NotConfigured`](ErrorKind::NotConfigured) before anything is touched.
    pub fn executable(&self) -> Result<PathBuf> {
        command::resolve_executable(self.kind, &self.settings)
    }

    /// Every save subtree this family can produce. Dolphin reports both of
    /// its layouts so sessions of unknown variant can still be recovered.
    pub fn save_subtrees(&self) -> Vec<&'static str> {
        match self.kind {
            EmulatorKind::Ppsspp => vec![ppsspp::SAVE_SUBTREE],
            EmulatorKind::Dolphin => vec![dolphin::GAMECUBE_SUBTREE, dolphin::WII_SUBTREE],
            EmulatorKind::Pcsx2 => vec![pcsx2::SAVE_SUBTREE],
            EmulatorKind::Generic => vec![],
        }
    }

    fn config_file(&self) -> Option<&'static str> {
        match self.kind {
            EmulatorKind::Ppsspp => Some(ppsspp::CONFIG_FILE),
            EmulatorKind::Dolphin => Some(dolphin::CONFIG_FILE),
            EmulatorKind::Pcsx2 => Some(pcsx2::CONFIG_FILE),
            EmulatorKind::Generic => None,
        }
    }

    fn required_settings(&self, variant: Option<DolphinVariant>) -> Vec<IniSetting> {
        match (self.kind, variant) {
            (EmulatorKind::Ppsspp, _) => ppsspp::REQUIRED.to_vec(),
            (EmulatorKind::Dolphin, Some(variant)) => variant.required(),
            (EmulatorKind::Dolphin, None) => DolphinVariant::GameCube.required(),
            (EmulatorKind::Pcsx2, _) => pcsx2::REQUIRED.to_vec(),
            (EmulatorKind::Generic, _) => vec![],
        }
    }

    fn save_subtree_for(&self, variant: Option<DolphinVariant>) -> PathBuf {
        match (self.kind, variant) {
            (EmulatorKind::Dolphin, Some(variant)) => PathBuf::from(variant.save_subtree()),
            _ => self.save_subtrees().first().map(PathBuf::from).unwrap_or_default(),
        }
    }

    /// Build a fresh session directory for one run.
    ///
    /// Any stale session is wiped. The persistent config template is copied
    /// in (without its save subtrees), the save subtree is created empty and
    /// the family's required keys are merged into its config file.
    #[instrument(skip_all, fields(asset_id = asset.id, emulator = %self.kind, session = %session_dir.display()))]
    pub async fn prepare_session_environment(
        &self,
        asset: &GameAsset,
        payload: &Path,
        session_dir: &Path,
        persistent_config_dir: &Path,
    ) -> Result<SessionInfo> {
        self.executable()?;
        let variant = match self.kind {
            EmulatorKind::Dolphin => {
                let size = tokio::fs::metadata(payload).await.map(|m| m.len()).unwrap_or(0);
                Some(DolphinVariant::detect(&asset.platform, size))
            },
            _ => None,
        };
        let info = SessionInfo {
            emulator: self.kind,
            variant,
            session_dir: session_dir.to_path_buf(),
            save_subtree: self.save_subtree_for(variant),
        };

        let template = persistent_config_dir.to_path_buf();
        let session = session_dir.to_path_buf();
        let save_root = info.save_subtree.clone();
        let subtrees = self.save_subtrees();
        let config_file = self.config_file();
        let required = self.required_settings(variant);
        let copy_template = self.kind != EmulatorKind::Generic;
        blocking(move || {
            fsutil::reset_dir(&session)?;
            if copy_template {
                let excluded: Vec<&Path> = subtrees.iter().map(Path::new).collect();
                fsutil::copy_tree(&template, &session, &excluded)?;
            }
            std::fs::create_dir_all(session.join(&save_root))?;
            if let Some(config_file) = config_file {
                ini::merge_file(&session.join(config_file), &required)?;
            }
            Ok(())
        })
        .await
        .or_raise(|| ErrorKind::Session)?;
        tracing::debug!(variant = ?info.variant, "Session environment prepared");
        Ok(info)
    }

    pub fn locate_save_root(&self, info: &SessionInfo) -> PathBuf {
        info.session_dir.join(&info.save_subtree)
    }

    /// Mirror a session's save subtrees into the persistent save directory,
    /// replacing what was there.
    ///
    /// Returns the files written, relative to `persistent_save_dir`. When the
    /// session holds no save files the persistent directory is left alone and
    /// the result is empty.
    #[instrument(skip_all, fields(emulator = %self.kind, session = %session_dir.display()))]
    pub async fn extract_saves_from_session(
        &self,
        session_dir: &Path,
        persistent_save_dir: &Path,
    ) -> Result<Vec<String>> {
        let session = session_dir.to_path_buf();
        let persistent = persistent_save_dir.to_path_buf();
        let subtrees = self.save_subtrees();
        let written = blocking(move || {
            if subtrees.is_empty() {
                if !fsutil::has_files(&session) {
                    return Ok(Vec::new());
                }
                fsutil::reset_dir(&persistent)?;
                return fsutil::copy_flat(&session, &persistent);
            }
            if !subtrees.iter().any(|s| fsutil::has_files(&session.join(s))) {
                return Ok(Vec::new());
            }
            fsutil::reset_dir(&persistent)?;
            let mut written = Vec::new();
            for subtree in subtrees {
                let copied = fsutil::copy_tree(&session.join(subtree), &persistent.join(subtree), &[])?;
                written.extend(copied.into_iter().map(|f| Path::new(subtree).join(f)));
            }
            Ok(written)
        })
        .await
        .or_raise(|| ErrorKind::Session)?;
        let written: Vec<String> = written.iter().map(|p| fsutil::display_relative(p)).collect();
        tracing::debug!(files = written.len(), "Saves extracted from session");
        Ok(written)
    }

    /// Copy the persistent save state into a prepared session. Returns the
    /// number of files copied.
    pub async fn prepare_saves(&self, info: &SessionInfo, persistent_save_dir: &Path) -> Result<usize> {
        let persistent = persistent_save_dir.to_path_buf();
        let session = info.session_dir.clone();
        let subtrees = self.save_subtrees();
        blocking(move || {
            if subtrees.is_empty() {
                return fsutil::copy_tree(&persistent, &session, &[]).map(|c| c.len());
            }
            let mut count = 0;
            for subtree in subtrees {
                count += fsutil::copy_tree(&persistent.join(subtree), &session.join(subtree), &[])?.len();
            }
            Ok(count)
        })
        .await
        .or_raise(|| ErrorKind::Session)
    }

    /// Start the emulator on `payload`, pointed at the session directory.
    #[instrument(skip_all, fields(emulator = %self.kind, rom = %payload.display()))]
    pub fn launch(&self, payload: &Path, session_dir: &Path) -> Result<Child> {
        let executable = self.executable()?;
        let values = command::Placeholders { rom: Some(payload), session: session_dir, user_dir: session_dir };
        let args = command::render_args(self.kind, &self.settings.launch_args(self.kind), &values)?;
        self.spawn(&executable, &args, session_dir)
    }

    /// Open the emulator without a game, pointed at the shared config
    /// template so its settings persist across sessions.
    #[instrument(skip_all, fields(emulator = %self.kind))]
    pub async fn launch_configuration(&self, shared_config_dir: &Path) -> Result<Child> {
        let executable = self.executable()?;
        tokio::fs::create_dir_all(shared_config_dir).await.or_raise(|| ErrorKind::Session)?;
        let values = command::Placeholders { rom: None, session: shared_config_dir, user_dir: shared_config_dir };
        let args = command::render_args(self.kind, &self.settings.configure_args(self.kind), &values)?;
        self.spawn(&executable, &args, shared_config_dir)
    }

    fn spawn(&self, executable: &Path, args: &[String], working_dir: &Path) -> Result<Child> {
        let child = Command::new(executable)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .spawn()
            .or_raise(|| ErrorKind::Launch(self.kind))?;
        tracing::info!(executable = %executable.display(), pid = child.id(), "Emulator started");
        Ok(child)
    }
}
