//! Streaming content hashing for cache integrity decisions.
//!
//! Files are hashed once with CRC32, MD5 and SHA1 together, in bounded
//! chunks, and compared against whatever hashes the remote server declared.
//! A [`Verdict`] is valid as soon as any single algorithm agrees.

mod digest;
pub mod error;
mod verdict;

pub use crate::digest::{DEFAULT_CHUNK_SIZE, Digests, compute_digests, digest_reader};
pub use crate::verdict::{AlgorithmCheck, ExpectedHashes, Verdict, verify};
