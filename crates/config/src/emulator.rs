use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of emulator families the engine knows how to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmulatorKind {
    /// Handheld memory-stick family.
    Ppsspp,
    /// Disc-based GameCube/Wii family.
    Dolphin,
    /// Optical-disc family with memory cards.
    Pcsx2,
    /// Anything else; the whole session is treated as save data.
    Generic,
}
impl EmulatorKind {
    pub const ALL: [EmulatorKind; 4] = [Self::Ppsspp, Self::Dolphin, Self::Pcsx2, Self::Generic];

    /// Stable key used in directory names and upload tags.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ppsspp => "ppsspp",
            Self::Dolphin => "dolphin",
            Self::Pcsx2 => "pcsx2",
            Self::Generic => "generic",
        }
    }

    /// Arguments used to launch a game when none are configured.
    ///
    /// Emulators with a settings-directory flag are pointed at the session.
    /// PPSSPP has none and finds `memstick/` in its working directory, which
    /// is the session.
    pub fn default_args(&self) -> &'static [&'static str] {
        match self {
            Self::Dolphin => &["--user={{ user_dir }}", "--batch", "--exec={{ rom }}"],
            Self::Pcsx2 => &["--cfgpath={{ user_dir }}/inis", "{{ rom }}"],
            Self::Ppsspp | Self::Generic => &["{{ rom }}"],
        }
    }

    /// Arguments used to open the emulator's own settings when none are
    /// configured.
    pub fn default_config_args(&self) -> &'static [&'static str] {
        match self {
            Self::Dolphin => &["--user={{ user_dir }}"],
            Self::Pcsx2 => &["--cfgpath={{ user_dir }}/inis"],
            Self::Ppsspp | Self::Generic => &[],
        }
    }
}
impl fmt::Display for EmulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
impl FromStr for EmulatorKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == lower)
            .ok_or_else(|| Error::from(ErrorKind::UnknownEmulator(s.to_string())))
    }
}

/// How to run one emulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorSettings {
    /// Absolute path, or a bare command name resolved through `PATH`.
    pub executable: Option<String>,
    /// Launch arguments; supports `{{ rom }}`, `{{ session }}` and
    /// `{{ user_dir }}` placeholders.
    pub args: Vec<String>,
    /// Arguments for opening the emulator's settings without a game.
    pub config_args: Vec<String>,
}
impl EmulatorSettings {
    pub fn new(executable: impl Into<String>) -> Self {
        Self { executable: Some(executable.into()), ..Self::default() }
    }

    pub fn with_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The executable, ignoring blank values.
    pub fn executable(&self) -> Option<&str> {
        self.executable.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    /// Launch arguments, falling back to the family's defaults.
    pub fn launch_args(&self, kind: EmulatorKind) -> Vec<String> {
        Self::or_defaults(&self.args, kind.default_args())
    }

    pub fn configure_args(&self, kind: EmulatorKind) -> Vec<String> {
        Self::or_defaults(&self.config_args, kind.default_config_args())
    }

    fn or_defaults(configured: &[String], defaults: &[&str]) -> Vec<String> {
        if configured.is_empty() { defaults.iter().map(|a| a.to_string()).collect() } else { configured.to_vec() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ppsspp", EmulatorKind::Ppsspp)]
    #[case("Dolphin", EmulatorKind::Dolphin)]
    #[case(" PCSX2 ", EmulatorKind::Pcsx2)]
    #[case("generic", EmulatorKind::Generic)]
    fn test_from_str(#[case] input: &str, #[case] expected: EmulatorKind) {
        assert_eq!(input.parse::<EmulatorKind>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "mame".parse::<EmulatorKind>().unwrap_err();
        assert_eq!(*err, ErrorKind::UnknownEmulator("mame".to_string()));
    }

    #[test]
    fn test_display_matches_key() {
        for kind in EmulatorKind::ALL {
            assert_eq!(kind.to_string(), kind.key());
        }
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("  "), None)]
    #[case(Some("ppsspp"), Some("ppsspp"))]
    fn test_blank_executable_is_unset(#[case] configured: Option<&str>, #[case] expected: Option<&str>) {
        let settings = EmulatorSettings { executable: configured.map(String::from), ..Default::default() };
        assert_eq!(settings.executable(), expected);
    }

    #[rstest]
    #[case(EmulatorKind::Ppsspp, &["{{ rom }}"])]
    #[case(EmulatorKind::Dolphin, &["--user={{ user_dir }}", "--batch", "--exec={{ rom }}"])]
    #[case(EmulatorKind::Pcsx2, &["--cfgpath={{ user_dir }}/inis", "{{ rom }}"])]
    #[case(EmulatorKind::Generic, &["{{ rom }}"])]
    fn test_default_args(#[case] kind: EmulatorKind, #[case] expected: &[&str]) {
        assert_eq!(EmulatorSettings::new("emu").launch_args(kind), expected);
    }

    #[test]
    fn test_args_fall_back_to_defaults() {
        let settings = EmulatorSettings::new("dolphin-emu");
        assert_eq!(settings.launch_args(EmulatorKind::Dolphin)[2], "--exec={{ rom }}");
        assert!(settings.configure_args(EmulatorKind::Ppsspp).is_empty());
        assert_eq!(settings.configure_args(EmulatorKind::Pcsx2), vec!["--cfgpath={{ user_dir }}/inis"]);
        let custom = settings.with_args(["-b", "{{ rom }}"]);
        assert_eq!(custom.launch_args(EmulatorKind::Dolphin), vec!["-b", "{{ rom }}"]);
    }
}
