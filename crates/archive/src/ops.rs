//! Archive Operations

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::instrument;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// What an extraction pass did, as paths relative to the destination.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Files written during this pass.
    pub written: Vec<PathBuf>,
    /// Files already present with the expected size.
    pub skipped: Vec<PathBuf>,
}
impl Extraction {
    /// Nothing needed writing; the archive had already been extracted.
    pub fn is_noop(&self) -> bool {
        self.written.is_empty()
    }
}

/// Extract the ZIP at `archive` into `destination`.
///
/// Members that already exist on disk with the same uncompressed size are
/// left untouched, so running this twice on the same asset is a no-op.
pub async fn extract(archive: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<Extraction> {
    let archive = archive.as_ref().to_path_buf();
    let destination = destination.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = File::open(&archive).or_raise(|| ErrorKind::Io)?;
        extract_from(BufReader::new(file), &destination, false)
    })
    .await
    .or_raise(|| ErrorKind::Worker)?
}

/// Unpack an in-memory ZIP over `destination`, overwriting existing files.
pub async fn unpack(bytes: Vec<u8>, destination: impl AsRef<Path>) -> Result<Extraction> {
    let destination = destination.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || extract_from(Cursor::new(bytes), &destination, true))
        .await
        .or_raise(|| ErrorKind::Worker)?
}

/// Pack every file under `source` into a new ZIP at `target`, with entry
/// names relative to `source`. Returns the number of files packed.
pub async fn pack_dir(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<usize> {
    let source = source.as_ref().to_path_buf();
    let target = target.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || pack_dir_sync(&source, &target)).await.or_raise(|| ErrorKind::Worker)?
}

#[instrument(skip(reader), fields(destination = %destination.display(), written, skipped))]
fn extract_from<R: Read + Seek>(reader: R, destination: &Path, overwrite: bool) -> Result<Extraction> {
    let mut archive = ZipArchive::new(reader).or_raise(|| ErrorKind::InvalidData)?;
    let mut extraction = Extraction::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).or_raise(|| ErrorKind::InvalidData)?;
        // Zip-slip: refuse any member name that resolves outside the destination.
        let Some(relative) = entry.enclosed_name() else {
            exn::bail!(ErrorKind::UnsafeEntry(entry.name().to_string()));
        };
        let target = destination.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).or_raise(|| ErrorKind::Io)?;
            continue;
        }
        if !overwrite
            && let Ok(existing) = fs::metadata(&target)
            && existing.is_file()
            && existing.len() == entry.size()
        {
            extraction.skipped.push(relative);
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        let mut output = File::create(&target).or_raise(|| ErrorKind::Io)?;
        io::copy(&mut entry, &mut output).or_raise(|| ErrorKind::InvalidData)?;
        extraction.written.push(relative);
    }
    tracing::Span::current().record("written", extraction.written.len()).record("skipped", extraction.skipped.len());
    tracing::debug!("Archive extracted");
    Ok(extraction)
}

fn pack_dir_sync(source: &Path, target: &Path) -> Result<usize> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
    }
    let mut writer = ZipWriter::new(File::create(target).or_raise(|| ErrorKind::Io)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut packed = 0;
    for entry in WalkDir::new(source).min_depth(1).follow_links(false).sort_by_file_name() {
        let entry = entry.or_raise(|| ErrorKind::Io)?;
        let relative = entry.path().strip_prefix(source).or_raise(|| ErrorKind::Io)?;
        // ZIP entry names always use forward slashes.
        let name = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        if entry.file_type().is_dir() {
            writer.add_directory(name, options).or_raise(|| ErrorKind::Io)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options).or_raise(|| ErrorKind::Io)?;
            let mut input = File::open(entry.path()).or_raise(|| ErrorKind::Io)?;
            io::copy(&mut input, &mut writer).or_raise(|| ErrorKind::Io)?;
            packed += 1;
        }
    }
    writer.finish().or_raise(|| ErrorKind::Io)?;
    tracing::debug!(source = %source.display(), target = %target.display(), files = packed, "Directory packed");
    Ok(packed)
}
