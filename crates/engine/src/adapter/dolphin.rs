//! Dolphin: one emulator, two save layouts.

use super::ini::IniSetting;
use serde::{Deserialize, Serialize};

pub(super) const CONFIG_FILE: &str = "Config/Dolphin.ini";
pub(super) const GAMECUBE_SUBTREE: &str = "GC";
pub(super) const WII_SUBTREE: &str = "Wii/title";
/// Payloads larger than a full GameCube disc can only be Wii images.
pub const WII_SIZE_THRESHOLD: u64 = 1_459_978_240;

const COMMON: &[IniSetting] = &[("Interface", "ConfirmStop", "False"), ("Analytics", "PermissionAsked", "True")];
// Slot A as a GCI folder keeps one file per save instead of a whole card image.
const GAMECUBE: &[IniSetting] = &[("Core", "SlotA", "8"), ("Core", "SlotB", "255")];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DolphinVariant {
    GameCube,
    Wii,
}
impl DolphinVariant {
    /// Explicit platform metadata wins; otherwise guess from payload size.
    pub fn detect(platform: &str, payload_size: u64) -> Self {
        match platform.trim().to_ascii_lowercase().as_str() {
            "gc" | "ngc" | "gamecube" => Self::GameCube,
            "wii" => Self::Wii,
            _ if payload_size > WII_SIZE_THRESHOLD => Self::Wii,
            _ => Self::GameCube,
        }
    }

    pub fn save_subtree(&self) -> &'static str {
        match self {
            Self::GameCube => GAMECUBE_SUBTREE,
            Self::Wii => WII_SUBTREE,
        }
    }

    pub(super) fn required(&self) -> Vec<IniSetting> {
        let specific: &[IniSetting] = match self {
            Self::GameCube => GAMECUBE,
            Self::Wii => &[],
        };
        COMMON.iter().chain(specific).copied().collect()
    }
}
