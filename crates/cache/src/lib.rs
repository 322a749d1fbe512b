//! SQLite registry of locally cached game assets.
//!
//! The registry is not the source of truth; the files under `roms/` are. It
//! only remembers which asset was downloaded into which directory and which
//! files it produced, so it can be deleted and rebuilt at any time.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::LocalAsset;
pub use crate::repo::Repository;
