//! On-disk layout under the data root.
//!
//! ```text
//! roms/<platform>/game_<id>/...
//! saves/<platform>/game_<id>/...
//! saves/<platform>/game_<id>_session/...
//! emulatorConfigs/<emulatorKey>/...
//! registry.sqlite
//! ```

use romsync_config::EmulatorKind;
use std::path::{Path, PathBuf};

pub const ROMS_DIR: &str = "roms";
pub const SAVES_DIR: &str = "saves";
pub const EMULATOR_CONFIGS_DIR: &str = "emulatorConfigs";
pub const REGISTRY_FILE: &str = "registry.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}
impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache directory of one asset.
    pub fn rom_dir(&self, platform: &str, id: u64) -> PathBuf {
        self.root.join(ROMS_DIR).join(platform_dir(platform)).join(game_dir(id))
    }

    pub fn saves_root(&self) -> PathBuf {
        self.root.join(SAVES_DIR)
    }

    /// Persistent save state of one asset.
    pub fn save_dir(&self, platform: &str, id: u64) -> PathBuf {
        self.saves_root().join(platform_dir(platform)).join(game_dir(id))
    }

    /// Ephemeral session directory of one asset.
    pub fn session_dir(&self, platform: &str, id: u64) -> PathBuf {
        self.saves_root().join(platform_dir(platform)).join(format!("{}_session", game_dir(id)))
    }

    /// Shared config template of one emulator family.
    pub fn emulator_config_dir(&self, kind: EmulatorKind) -> PathBuf {
        self.root.join(EMULATOR_CONFIGS_DIR).join(kind.key())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }
}

fn game_dir(id: u64) -> String {
    format!("game_{id}")
}

// Platform slugs come from the server; never let one climb out of its parent.
fn platform_dir(platform: &str) -> String {
    let slug: String = platform
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if slug.is_empty() { "unknown".to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_paths() {
        let layout = Layout::new("/data");
        assert_eq!(layout.rom_dir("psp", 7), PathBuf::from("/data/roms/psp/game_7"));
        assert_eq!(layout.save_dir("psp", 7), PathBuf::from("/data/saves/psp/game_7"));
        assert_eq!(layout.session_dir("psp", 7), PathBuf::from("/data/saves/psp/game_7_session"));
        assert_eq!(layout.emulator_config_dir(EmulatorKind::Dolphin), PathBuf::from("/data/emulatorConfigs/dolphin"));
        assert_eq!(layout.registry_path(), PathBuf::from("/data/registry.sqlite"));
    }

    #[rstest]
    #[case("PSP", "psp")]
    #[case("../etc", "___etc")]
    #[case("", "unknown")]
    #[case("game-cube", "game-cube")]
    fn test_platform_dir(#[case] platform: &str, #[case] expected: &str) {
        assert_eq!(platform_dir(platform), expected);
    }
}
