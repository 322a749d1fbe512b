use crate::error::{ErrorKind, Result};
use serde::Serialize;

/// Where one launch is in its lifecycle.
///
/// ```text
/// CheckSaves -> NeedsChoice -> AwaitingChoice -> Resolved -> Running -> Syncing -> Cleaned
///      \________________________________________/^
/// ```
///
/// Any non-terminal state may also abort straight to `Cleaned`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchState {
    #[default]
    CheckSaves,
    NeedsChoice,
    AwaitingChoice,
    Resolved,
    Running,
    Syncing,
    Cleaned,
}
impl LaunchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cleaned)
    }

    pub fn can_transition_to(&self, next: LaunchState) -> bool {
        use LaunchState::*;
        matches!(
            (self, next),
            (CheckSaves, NeedsChoice | Resolved)
                | (NeedsChoice, AwaitingChoice)
                | (AwaitingChoice, Resolved)
                | (Resolved, Running)
                | (Running, Syncing)
        ) || (!self.is_terminal() && next == Cleaned)
    }
}

/// The state of one launch, with every move checked.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    asset_id: u64,
    state: LaunchState,
}
impl Lifecycle {
    pub(crate) fn new(asset_id: u64) -> Self {
        Self { asset_id, state: LaunchState::default() }
    }

    pub(crate) fn asset_id(&self) -> u64 {
        self.asset_id
    }

    pub(crate) fn state(&self) -> LaunchState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: LaunchState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            exn::bail!(ErrorKind::InvalidState(format!("{:?} -> {:?}", self.state, next)));
        }
        tracing::debug!(asset_id = self.asset_id, from = ?self.state, to = ?next, "Launch state changed");
        self.state = next;
        Ok(())
    }
}
