use crate::digest::{Digests, compute_digests};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hashes declared by the remote server for one content file.
///
/// Servers frequently populate only a subset of these, so every field is
/// optional and blank strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedHashes {
    #[serde(default)]
    pub crc32: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}
impl ExpectedHashes {
    pub fn crc32(value: impl Into<String>) -> Self {
        Self { crc32: Some(value.into()), ..Self::default() }
    }

    /// No algorithm has a usable expected value.
    pub fn is_empty(&self) -> bool {
        [&self.crc32, &self.md5, &self.sha1].into_iter().all(|h| normalize(h.as_deref(), 0).is_none())
    }
}

/// Outcome of comparing one algorithm's expected and actual digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmCheck {
    pub expected: Option<String>,
    pub actual: String,
    pub matches: bool,
}
impl AlgorithmCheck {
    fn new(expected: Option<&str>, actual: &str, width: usize) -> Self {
        let expected = normalize(expected, width);
        let matches = expected.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(actual));
        Self { expected, actual: actual.to_string(), matches }
    }
}

/// Per-algorithm comparison of a file against its declared hashes.
///
/// A verdict is valid when **any** algorithm matches. This tolerates servers
/// that only populate some of the hash fields, or populate one incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub valid: bool,
    pub crc32: AlgorithmCheck,
    pub md5: AlgorithmCheck,
    pub sha1: AlgorithmCheck,
}
impl Verdict {
    pub fn new(expected: &ExpectedHashes, actual: &Digests) -> Self {
        let crc32 = AlgorithmCheck::new(expected.crc32.as_deref(), &actual.crc32, 8);
        let md5 = AlgorithmCheck::new(expected.md5.as_deref(), &actual.md5, 0);
        let sha1 = AlgorithmCheck::new(expected.sha1.as_deref(), &actual.sha1, 0);
        let valid = crc32.matches || md5.matches || sha1.matches;
        Self { valid, crc32, md5, sha1 }
    }

    /// At least one algorithm had an expected value to compare against.
    pub fn has_expectations(&self) -> bool {
        self.checks().any(|(_, check)| check.expected.is_some())
    }

    pub fn checks(&self) -> impl Iterator<Item = (&'static str, &AlgorithmCheck)> {
        [("crc32", &self.crc32), ("md5", &self.md5), ("sha1", &self.sha1)].into_iter()
    }
}

/// Hash `path` and compare it against `expected`.
pub async fn verify(path: impl AsRef<Path>, expected: &ExpectedHashes, chunk_size: usize) -> Result<Verdict> {
    let digests = compute_digests(path, chunk_size).await?;
    Ok(Verdict::new(expected, &digests))
}

// Declared hashes come in all shapes: upper case, `0x` prefixes, CRCs with
// their leading zeros dropped.
fn normalize(value: Option<&str>, width: usize) -> Option<String> {
    let value = value?.trim();
    let value = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    if value.is_empty() {
        return None;
    }
    Some(format!("{:0>width$}", value.to_ascii_lowercase()))
}
