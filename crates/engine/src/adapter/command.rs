//! Executable discovery and argument templating.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use romsync_config::{EmulatorKind, EmulatorSettings};
use std::path::{Path, PathBuf};

/// Values substituted into `{{ rom }}`, `{{ session }}` and `{{ user_dir }}`.
pub(crate) struct Placeholders<'a> {
    pub(crate) rom: Option<&'a Path>,
    pub(crate) session: &'a Path,
    pub(crate) user_dir: &'a Path,
}

/// Resolve the configured executable to a path that exists.
///
/// Values with a directory component must point at a file; bare names are
/// looked up on `PATH`.
pub(crate) fn resolve_executable(kind: EmulatorKind, settings: &EmulatorSettings) -> Result<PathBuf> {
    let configured = settings.executable().ok_or_raise(|| ErrorKind::NotConfigured(kind))?;
    let path = Path::new(configured);
    if path.is_absolute() || path.components().count() > 1 {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotConfigured(kind));
        }
        return Ok(path.to_path_buf());
    }
    which::which(configured).or_raise(|| ErrorKind::NotConfigured(kind))
}

pub(crate) fn render_args(kind: EmulatorKind, args: &[String], values: &Placeholders<'_>) -> Result<Vec<String>> {
    let engine = upon::Engine::new();
    let context = upon::value! {
        rom: values.rom.map(|p| p.display().to_string()).unwrap_or_default(),
        session: values.session.display().to_string(),
        user_dir: values.user_dir.display().to_string(),
    };
    let mut rendered = Vec::with_capacity(args.len());
    for arg in args {
        let template = engine.compile(arg.as_str()).or_raise(|| ErrorKind::Launch(kind))?;
        let arg = template.render(&engine, context.clone()).to_string().or_raise(|| ErrorKind::Launch(kind))?;
        // An argument that was only `{{ rom }}` disappears when there is no game.
        if !arg.is_empty() {
            rendered.push(arg);
        }
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_args() {
        let args = vec!["--user={{ user_dir }}".to_string(), "--exec={{ rom }}".to_string(), "-b".to_string()];
        let values = Placeholders {
            rom: Some(Path::new("/data/roms/wii/game_1/game.wbfs")),
            session: Path::new("/data/saves/wii/game_1_session"),
            user_dir: Path::new("/data/saves/wii/game_1_session"),
        };
        let rendered = render_args(EmulatorKind::Dolphin, &args, &values).unwrap();
        assert_eq!(
            rendered,
            vec!["--user=/data/saves/wii/game_1_session", "--exec=/data/roms/wii/game_1/game.wbfs", "-b"]
        );
    }

    #[test]
    fn test_render_without_rom_drops_empty_args() {
        let args = vec!["{{ rom }}".to_string(), "{{ session }}".to_string()];
        let values = Placeholders { rom: None, session: Path::new("/cfg"), user_dir: Path::new("/cfg") };
        assert_eq!(render_args(EmulatorKind::Generic, &args, &values).unwrap(), vec!["/cfg"]);
    }

    #[test]
    fn test_render_unknown_placeholder() {
        let args = vec!["{{ nope }}".to_string()];
        let values = Placeholders { rom: None, session: Path::new("/s"), user_dir: Path::new("/s") };
        let err = render_args(EmulatorKind::Generic, &args, &values).unwrap_err();
        assert_eq!(*err, ErrorKind::Launch(EmulatorKind::Generic));
    }

    #[test]
    fn test_unset_executable() {
        let err = resolve_executable(EmulatorKind::Ppsspp, &EmulatorSettings::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::NotConfigured(EmulatorKind::Ppsspp));
    }

    #[test]
    fn test_missing_executable_path() {
        let settings = EmulatorSettings::new("/nonexistent/bin/PPSSPPSDL");
        let err = resolve_executable(EmulatorKind::Ppsspp, &settings).unwrap_err();
        assert_eq!(*err, ErrorKind::NotConfigured(EmulatorKind::Ppsspp));
    }

    #[test]
    fn test_bare_name_not_on_path() {
        let settings = EmulatorSettings::new("definitely-not-an-emulator-binary");
        assert!(resolve_executable(EmulatorKind::Pcsx2, &settings).is_err());
    }

    #[test]
    fn test_existing_executable_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let settings = EmulatorSettings::new(file.path().to_str().unwrap());
        assert_eq!(resolve_executable(EmulatorKind::Generic, &settings).unwrap(), file.path());
    }
}
