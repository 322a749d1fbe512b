//! Configuration loading and validation.
//!
//! Layers, lowest precedence first:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. An optional YAML, TOML or JSON file, picked by extension.
//! 3. Environment variables prefixed `ROMSYNC_`, with nested keys separated
//!    by `__` (e.g. `ROMSYNC_EMULATORS__DOLPHIN__EXECUTABLE`).
//!
//! The result is a plain value handed to the engine; nothing here is global.

mod emulator;
pub mod error;

pub use crate::emulator::{EmulatorKind, EmulatorSettings};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "ROMSYNC_";
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 32 * 1024 * 1024;
pub const DEFAULT_CHOICE_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of `roms/`, `saves/`, `emulatorConfigs/` and the registry.
    pub data_root: PathBuf,
    /// Bytes read per step while hashing.
    pub hash_chunk_size: usize,
    /// How long to wait for a save choice before defaulting to the local save.
    pub choice_timeout_secs: u64,
    pub emulators: BTreeMap<EmulatorKind, EmulatorSettings>,
    /// Platform slug to emulator family.
    pub platforms: BTreeMap<String, EmulatorKind>,
}
impl Default for Config {
    fn default() -> Self {
        let platforms = [
            ("psp", EmulatorKind::Ppsspp),
            ("gc", EmulatorKind::Dolphin),
            ("ngc", EmulatorKind::Dolphin),
            ("gamecube", EmulatorKind::Dolphin),
            ("wii", EmulatorKind::Dolphin),
            ("ps2", EmulatorKind::Pcsx2),
        ];
        Self {
            data_root: default_data_root(),
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
            choice_timeout_secs: DEFAULT_CHOICE_TIMEOUT_SECS,
            emulators: BTreeMap::new(),
            platforms: platforms.into_iter().map(|(p, k)| (p.to_string(), k)).collect(),
        }
    }
}

impl Config {
    /// Load and validate configuration from every layer.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(data_root = %config.data_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// The layered provider stack, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            if !path.is_file() {
                exn::bail!(ErrorKind::Missing(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("toml") => figment.merge(Toml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.hash_chunk_size == 0 {
            exn::bail!(ErrorKind::Invalid("hash_chunk_size must be greater than zero".to_string()));
        }
        if self.choice_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("choice_timeout_secs must be greater than zero".to_string()));
        }
        if !self.data_root.is_absolute() {
            exn::bail!(ErrorKind::Invalid(format!("data_root must be absolute: {}", self.data_root.display())));
        }
        Ok(())
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    pub fn with_emulator(mut self, kind: EmulatorKind, settings: EmulatorSettings) -> Self {
        self.emulators.insert(kind, settings);
        self
    }

    pub fn choice_timeout(&self) -> Duration {
        Duration::from_secs(self.choice_timeout_secs)
    }

    /// The emulator family configured for a platform slug (case-insensitive).
    pub fn emulator_for_platform(&self, platform: &str) -> Option<EmulatorKind> {
        let platform = platform.trim().to_ascii_lowercase();
        self.platforms.get(&platform).copied()
    }

    /// Settings for an emulator; unset entries behave as "not configured".
    pub fn emulator(&self, kind: EmulatorKind) -> EmulatorSettings {
        self.emulators.get(&kind).cloned().unwrap_or_default()
    }
}

fn default_data_root() -> PathBuf {
    directories::ProjectDirs::from("", "", "romsync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("romsync"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.hash_chunk_size, 32 * 1024 * 1024);
        assert_eq!(config.choice_timeout(), Duration::from_secs(300));
        assert!(config.emulators.is_empty());
    }

    #[rstest]
    #[case("psp", Some(EmulatorKind::Ppsspp))]
    #[case("PSP", Some(EmulatorKind::Ppsspp))]
    #[case("gc", Some(EmulatorKind::Dolphin))]
    #[case("ngc", Some(EmulatorKind::Dolphin))]
    #[case("gamecube", Some(EmulatorKind::Dolphin))]
    #[case("wii", Some(EmulatorKind::Dolphin))]
    #[case("ps2", Some(EmulatorKind::Pcsx2))]
    #[case("snes", None)]
    fn test_default_platforms(#[case] platform: &str, #[case] expected: Option<EmulatorKind>) {
        assert_eq!(Config::default().emulator_for_platform(platform), expected);
    }

    #[rstest]
    #[case(Config { hash_chunk_size: 0, ..Config::default() })]
    #[case(Config { choice_timeout_secs: 0, ..Config::default() })]
    #[case(Config::default().with_data_root("relative/dir"))]
    fn test_validation_rejects(#[case] config: Config) {
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "romsync.yaml",
                concat!(
                    "data_root: /srv/romsync\n",
                    "choice_timeout_secs: 60\n",
                    "emulators:\n",
                    "  ppsspp:\n",
                    "    executable: /usr/bin/PPSSPPSDL\n",
                    "platforms:\n",
                    "  psx: generic\n",
                ),
            )?;
            jail.set_env("ROMSYNC_CHOICE_TIMEOUT_SECS", "30");
            jail.set_env("ROMSYNC_EMULATORS__DOLPHIN__EXECUTABLE", "dolphin-emu");
            let config = Config::load(Some(Path::new("romsync.yaml"))).unwrap();
            assert_eq!(config.data_root, PathBuf::from("/srv/romsync"));
            // Environment wins over the file.
            assert_eq!(config.choice_timeout_secs, 30);
            assert_eq!(config.emulator(EmulatorKind::Ppsspp).executable(), Some("/usr/bin/PPSSPPSDL"));
            assert_eq!(config.emulator(EmulatorKind::Dolphin).executable(), Some("dolphin-emu"));
            assert_eq!(config.emulator(EmulatorKind::Pcsx2).executable(), None);
            // Merged maps keep the defaults.
            assert_eq!(config.emulator_for_platform("psx"), Some(EmulatorKind::Generic));
            assert_eq!(config.emulator_for_platform("psp"), Some(EmulatorKind::Ppsspp));
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("romsync.toml", "data_root = \"/srv/games\"\nhash_chunk_size = 1024\n")?;
            let config = Config::load(Some(Path::new("romsync.toml"))).unwrap();
            assert_eq!(config.hash_chunk_size, 1024);
            assert_eq!(config.data_root, PathBuf::from("/srv/games"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        let err = Config::load(Some(Path::new("/nonexistent/romsync.yaml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Missing(_)));

        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("romsync.ini");
        std::fs::write(&ini, "data_root=/x").unwrap();
        let err = Config::load(Some(&ini)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_wrong_type_fails_to_load() {
        Jail::expect_with(|jail| {
            jail.set_env("ROMSYNC_HASH_CHUNK_SIZE", "lots");
            let err = Config::load(None).unwrap_err();
            assert_eq!(*err, ErrorKind::Load);
            Ok(())
        });
    }
}
