//! Save reconciliation.
//!
//! Per launch: [`compare_saves`] inspects both sides, [`auto_choice`]
//! settles the unambiguous cases, otherwise [`request_choice`] asks the
//! caller. [`apply_choice`] writes the chosen state into the session, and once
//! the emulator exits [`sync_after_exit`] uploads and mirrors what it wrote.

mod apply;
mod choice;
mod compare;
mod state;
mod sync;

pub use self::apply::apply_choice;
pub use self::choice::{ChoiceRequest, SaveChoice, auto_choice, request_choice};
pub use self::compare::{Recommendation, SaveCheck, SaveComparison, compare_saves, recommend};
pub use self::state::LaunchState;
pub(crate) use self::state::Lifecycle;
pub use self::sync::{SyncReport, sync_after_exit};
