//! Blocking filesystem helpers.
//!
//! Everything here is synchronous; async callers go through [`blocking`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Run a blocking filesystem closure on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

/// Every regular file under `dir`, relative to it, sorted. A missing
/// directory has no files.
pub(crate) fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            files.push(entry.path().strip_prefix(dir).map_err(io::Error::other)?.to_path_buf());
        }
    }
    Ok(files)
}

pub(crate) fn has_files(dir: &Path) -> bool {
    dir.is_dir()
        && WalkDir::new(dir).min_depth(1).follow_links(false).into_iter().flatten().any(|e| e.file_type().is_file())
}

/// Newest modification time of any file under `dir`.
pub(crate) fn latest_modified(dir: &Path) -> io::Result<Option<SystemTime>> {
    let mut latest = None;
    for relative in list_files(dir)? {
        let modified = fs::metadata(dir.join(relative))?.modified()?;
        latest = latest.max(Some(modified));
    }
    Ok(latest)
}

/// Copy the tree at `src` into `dst`, overwriting files that already exist.
///
/// Entries under any of the `exclude` prefixes (relative to `src`) are
/// skipped. Returns the copied files relative to `dst`.
pub(crate) fn copy_tree(src: &Path, dst: &Path, exclude: &[&Path]) -> io::Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    if !src.is_dir() {
        return Ok(copied);
    }
    fs::create_dir_all(dst)?;
    let is_excluded = |relative: &Path| {
        exclude.iter().any(|excluded| !excluded.as_os_str().is_empty() && relative.starts_with(excluded))
    };
    let walker = WalkDir::new(src).min_depth(1).follow_links(false).sort_by_file_name().into_iter();
    for entry in walker.filter_entry(|e| e.path().strip_prefix(src).is_ok_and(|r| !is_excluded(r))) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied.push(relative.to_path_buf());
        }
    }
    Ok(copied)
}

/// Copy every file under `src` directly into `dst`, by file name only.
/// Later files win when names collide.
pub(crate) fn copy_flat(src: &Path, dst: &Path) -> io::Result<Vec<PathBuf>> {
    let mut copied: Vec<PathBuf> = Vec::new();
    let files = list_files(src)?;
    if files.is_empty() {
        return Ok(copied);
    }
    fs::create_dir_all(dst)?;
    for relative in files {
        let Some(name) = relative.file_name() else { continue };
        fs::copy(src.join(&relative), dst.join(name))?;
        let name = PathBuf::from(name);
        if !copied.contains(&name) {
            copied.push(name);
        }
    }
    Ok(copied)
}

/// Replace `dir` with an empty directory.
pub(crate) fn reset_dir(dir: &Path) -> io::Result<()> {
    remove_path(dir)?;
    fs::create_dir_all(dir)
}

/// Remove a file or a whole directory tree. Missing paths are not an error.
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Render a relative path with `/` separators, for reports and archives.
pub(crate) fn display_relative(path: &Path) -> String {
    path.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, data: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_copy_tree_with_exclusion() {
        let src = tempfile::tempdir().unwrap();
        touch(&src.path().join("Config/Dolphin.ini"), b"[Core]");
        touch(&src.path().join("GC/USA/Card A/save.gci"), b"old save");
        let dst = tempfile::tempdir().unwrap();

        let copied = copy_tree(src.path(), dst.path(), &[Path::new("GC")]).unwrap();
        assert_eq!(copied, vec![PathBuf::from("Config/Dolphin.ini")]);
        assert!(!dst.path().join("GC").exists());
    }

    #[test]
    fn test_copy_flat_collapses_directories() {
        let src = tempfile::tempdir().unwrap();
        touch(&src.path().join("a/b/one.sav"), b"1");
        touch(&src.path().join("two.sav"), b"2");
        let dst = tempfile::tempdir().unwrap();
        let mut copied = copy_flat(src.path(), dst.path()).unwrap();
        copied.sort();
        assert_eq!(copied, vec![PathBuf::from("one.sav"), PathBuf::from("two.sav")]);
        assert_eq!(fs::read(dst.path().join("one.sav")).unwrap(), b"1");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_files(&missing).unwrap().is_empty());
        assert!(!has_files(&missing));
        assert_eq!(latest_modified(&missing).unwrap(), None);
        remove_path(&missing).unwrap();
    }

    #[test]
    fn test_empty_directories_have_no_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("memstick/PSP/SAVEDATA")).unwrap();
        assert!(!has_files(dir.path()));
        touch(&dir.path().join("memstick/PSP/SAVEDATA/GAME/DATA.BIN"), b"x");
        assert!(has_files(dir.path()));
        assert!(latest_modified(dir.path()).unwrap().is_some());
    }

    #[test]
    fn test_reset_dir() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("session/stale.txt"), b"x");
        reset_dir(&dir.path().join("session")).unwrap();
        assert!(dir.path().join("session").is_dir());
        assert!(!has_files(&dir.path().join("session")));
    }
}
