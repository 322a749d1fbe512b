//! PCSX2: portable memory cards in a folder next to the config.

use super::ini::IniSetting;

pub(super) const SAVE_SUBTREE: &str = "memcards";
pub(super) const CONFIG_FILE: &str = "inis/PCSX2.ini";
pub(super) const REQUIRED: &[IniSetting] = &[
    ("Folders", "MemoryCards", SAVE_SUBTREE),
    ("MemoryCards", "Slot1_Enable", "true"),
    ("UI", "SetupWizardIncomplete", "false"),
];
