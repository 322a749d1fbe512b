//! File classes and the integrity policy applied to each.

use std::path::Path;

/// ROM-class extensions: files an emulator can be pointed at directly.
pub const RAW_EXTENSIONS: &[&str] = &[
    "iso", "cso", "pbp", "elf", "bin", "cue", "img", "chd", "gcm", "gcz", "rvz", "wbfs", "wad", "ciso", "nds", "gba",
    "gb", "gbc", "nes", "sfc", "smc", "n64", "z64", "v64", "md", "gen", "sms", "gg", "a26", "pce", "3ds", "cia", "xci",
    "nsp", "m3u",
];

/// How a content file is treated, decided by extension (case-insensitive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileClass {
    /// A ZIP container. A hash mismatch is only a warning; the payload
    /// inside is what gets launched.
    Container,
    /// A launchable payload. A hash mismatch is fatal.
    Raw,
    /// Artwork, manuals, other archive formats. Never verified.
    Ignored,
}
impl FileClass {
    pub fn of(path: impl AsRef<Path>) -> Self {
        let Some(extension) = path.as_ref().extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) else {
            return Self::Ignored;
        };
        if romsync_archive::Container::from_path(path.as_ref()).is_container() {
            Self::Container
        } else if RAW_EXTENSIONS.contains(&extension.as_str()) {
            Self::Raw
        } else {
            Self::Ignored
        }
    }

    pub fn is_verified(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Lower is better when choosing which raw file to launch: playlists first,
/// then cue sheets, then anything else.
pub(crate) fn payload_priority(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("m3u") => 0,
        Some("cue") => 1,
        _ => 2,
    }
}
