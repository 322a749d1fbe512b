use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Default size of each read while hashing. Disc images are routinely several
/// gigabytes, so the whole file is never held in memory.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Lowercase hex digests of a file's content.
///
/// CRC32 is zero-padded to 8 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digests {
    pub crc32: String,
    pub md5: String,
    pub sha1: String,
}

/// Compute CRC32, MD5 and SHA1 of a file in a single streaming pass.
///
/// The file is read in `chunk_size` pieces on a blocking worker thread so the
/// async runtime keeps making progress while multi-gigabyte images are hashed.
///
/// # Errors
/// Any I/O failure while opening or reading the file is reported as
/// [`ErrorKind::HashFailed`] carrying the path.
#[instrument(skip_all, fields(path = %path.as_ref().display(), chunk_size))]
pub async fn compute_digests(path: impl AsRef<Path>, chunk_size: usize) -> Result<Digests> {
    let path: PathBuf = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || digest_file(&path, chunk_size)).await.or_raise(|| ErrorKind::Worker)?
}

fn digest_file(path: &Path, chunk_size: usize) -> Result<Digests> {
    let failed = || ErrorKind::HashFailed(path.to_path_buf());
    let mut file = File::open(path).or_raise(failed)?;
    let digests = digest_reader(&mut file, chunk_size).or_raise(failed)?;
    tracing::debug!(path = %path.display(), crc32 = %digests.crc32, "Computed file digests");
    Ok(digests)
}

/// Hash everything readable from `reader`, `chunk_size` bytes at a time.
pub fn digest_reader<R: Read>(reader: &mut R, chunk_size: usize) -> std::io::Result<Digests> {
    let mut crc32 = crc32fast::Hasher::new();
    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut buffer = vec![0; chunk_size.max(1)];
    loop {
        let bytes = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buffer[..bytes];
        crc32.update(chunk);
        md5.update(chunk);
        sha1.update(chunk);
    }
    Ok(Digests {
        crc32: format!("{:08x}", crc32.finalize()),
        md5: format!("{:x}", md5.finalize()),
        sha1: format!("{:x}", sha1.finalize()),
    })
}
