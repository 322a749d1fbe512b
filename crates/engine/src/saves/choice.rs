//! The save-choice request/response boundary.
//!
//! When a launch cannot settle on a save by itself it sends a
//! [`ChoiceRequest`] to the caller and waits, at most `timeout`, for the
//! answer. No answer means [`SaveChoice::Local`].

use super::compare::{Recommendation, SaveComparison, recommend};
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "source", content = "snapshot_id")]
pub enum SaveChoice {
    /// Keep the persistent local save.
    Local,
    /// Load one remote snapshot.
    Cloud(u64),
    /// Start with an empty save root.
    None,
}

/// Resolve without asking when there is nothing to choose between.
pub fn auto_choice(comparison: &SaveComparison) -> Option<SaveChoice> {
    if comparison.choice_required() {
        return None;
    }
    Some(match (comparison.has_local, comparison.newest_snapshot()) {
        (true, _) => SaveChoice::Local,
        (false, Some(snapshot)) => SaveChoice::Cloud(snapshot.id),
        (false, None) => SaveChoice::None,
    })
}

/// Sent to the caller when a choice is required.
#[derive(Debug)]
pub struct ChoiceRequest {
    pub asset_id: u64,
    pub comparison: SaveComparison,
    pub recommendation: Recommendation,
    reply: oneshot::Sender<SaveChoice>,
}
impl ChoiceRequest {
    /// Answer the request. Returns `false` if the launch stopped waiting.
    pub fn respond(self, choice: SaveChoice) -> bool {
        self.reply.send(choice).is_ok()
    }
}

/// Ask the caller over `choices` and wait for the answer.
///
/// Falls back to [`SaveChoice::Local`] when there is no channel, the channel
/// or reply is dropped, or nothing arrives within `timeout`.
pub async fn request_choice(
    choices: Option<&mpsc::Sender<ChoiceRequest>>,
    asset_id: u64,
    comparison: &SaveComparison,
    timeout: Duration,
) -> SaveChoice {
    let Some(choices) = choices else {
        tracing::warn!(asset_id, error = %ErrorKind::ChoiceTimeout, "No one to ask for a save choice; using local");
        return SaveChoice::Local;
    };
    let (reply, answer) = oneshot::channel();
    let request =
        ChoiceRequest { asset_id, comparison: comparison.clone(), recommendation: recommend(comparison), reply };
    let exchange = async {
        choices.send(request).await.ok()?;
        answer.await.ok()
    };
    match tokio::time::timeout(timeout, exchange).await {
        Ok(Some(choice)) => {
            tracing::info!(asset_id, ?choice, "Save choice received");
            choice
        },
        Ok(None) | Err(_) => {
            tracing::warn!(asset_id, error = %ErrorKind::ChoiceTimeout, "Falling back to the local save");
            SaveChoice::Local
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saves::compare::tests::snapshot;
    use time::OffsetDateTime;
    use time::macros::datetime;

    const T: OffsetDateTime = datetime!(2024-06-01 12:00:00 UTC);

    fn ambiguous() -> SaveComparison {
        SaveComparison::new(Some(T), vec![snapshot(3, T, None)])
    }

    #[test]
    fn test_auto_choice() {
        assert_eq!(auto_choice(&SaveComparison::new(None, vec![])), Some(SaveChoice::None));
        assert_eq!(auto_choice(&SaveComparison::new(Some(T), vec![])), Some(SaveChoice::Local));
        assert_eq!(auto_choice(&SaveComparison::new(None, vec![snapshot(4, T, None)])), Some(SaveChoice::Cloud(4)));
        assert_eq!(auto_choice(&ambiguous()), None);
        let two = SaveComparison::new(None, vec![snapshot(4, T, None), snapshot(5, T, None)]);
        assert_eq!(auto_choice(&two), None);
    }

    #[tokio::test]
    async fn test_choice_answered() {
        let (tx, mut rx) = mpsc::channel(1);
        let responder = tokio::spawn(async move {
            let request: ChoiceRequest = rx.recv().await.unwrap();
            assert_eq!(request.asset_id, 7);
            assert_eq!(request.recommendation, Recommendation::Same);
            request.respond(SaveChoice::Cloud(3))
        });
        let choice = request_choice(Some(&tx), 7, &ambiguous(), Duration::from_secs(5)).await;
        assert_eq!(choice, SaveChoice::Cloud(3));
        assert!(responder.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_choice_timeout_defaults_to_local() {
        let (tx, _rx) = mpsc::channel(1);
        let choice = request_choice(Some(&tx), 7, &ambiguous(), Duration::from_secs(300)).await;
        assert_eq!(choice, SaveChoice::Local);
    }

    #[tokio::test]
    async fn test_dropped_reply_defaults_to_local() {
        let (tx, mut rx) = mpsc::channel(1);
        tokio::spawn(async move { drop(rx.recv().await) });
        let choice = request_choice(Some(&tx), 7, &ambiguous(), Duration::from_secs(5)).await;
        assert_eq!(choice, SaveChoice::Local);
    }

    #[tokio::test]
    async fn test_no_channel_defaults_to_local() {
        assert_eq!(request_choice(None, 7, &ambiguous(), Duration::from_secs(5)).await, SaveChoice::Local);
    }

    #[test]
    fn test_choice_serialization() {
        assert_eq!(serde_json::to_string(&SaveChoice::Local).unwrap(), r#"{"source":"local"}"#);
        assert_eq!(serde_json::to_string(&SaveChoice::Cloud(3)).unwrap(), r#"{"source":"cloud","snapshot_id":3}"#);
    }
}
