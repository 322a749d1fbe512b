//! PPSSPP: everything lives on a virtual memory stick.

use super::ini::IniSetting;

pub(super) const SAVE_SUBTREE: &str = "memstick/PSP/SAVEDATA";
pub(super) const CONFIG_FILE: &str = "memstick/PSP/SYSTEM/ppsspp.ini";
pub(super) const REQUIRED: &[IniSetting] = &[
    ("General", "FirstRun", "False"),
    ("General", "CheckForNewVersion", "False"),
    // Savestates bypass the save subtree entirely.
    ("General", "AutoLoadSaveState", "0"),
];
