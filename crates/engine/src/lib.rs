//! Acquisition and reconciliation engine.
//!
//! - [`assets`]: keep a verified local copy of each game asset.
//! - [`adapter`]: per-emulator session directories, save locations and
//!   process launch.
//! - [`saves`]: compare local and remote saves, settle on one, and sync the
//!   session back after the emulator exits.
//! - [`recovery`]: fold sessions abandoned by a crash back into storage.
//!
//! [`Engine`] ties these together for one data root; [`api::Api`] wraps it
//! for callers that want a `success`/`message` response instead of errors.

pub mod adapter;
pub mod api;
pub mod assets;
pub mod error;
mod fsutil;
mod launch;
pub mod layout;
pub mod recovery;
pub mod saves;

pub use crate::launch::{Engine, LaunchOutcome, Launched};
pub use crate::layout::Layout;
