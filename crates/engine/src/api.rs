//! The caller-facing boundary.
//!
//! Every [`Api`] operation returns a [`Response`]. Errors become a readable
//! message and panics are caught, so nothing escapes to the presentation
//! layer.

use crate::assets::ProgressSink;
use crate::error::Result;
use crate::launch::{Engine, Launched};
use crate::saves::{ChoiceRequest, SaveCheck};
use futures::FutureExt;
use romsync_cache::LocalAsset;
use romsync_config::EmulatorKind;
use romsync_remote::models::GameAsset;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}
impl<T> Response<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: Some(data) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

pub struct Api {
    engine: Engine,
}
impl Api {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn ensure_available(&self, asset: &GameAsset, progress: ProgressSink) -> Response<LocalAsset> {
        guarded("ensure_available", self.engine.ensure_available(asset, &progress), |_| "asset available".to_string())
            .await
    }

    pub async fn launch_with_reconciliation(
        &self,
        asset: &GameAsset,
        progress: ProgressSink,
        choices: Option<mpsc::Sender<ChoiceRequest>>,
    ) -> Response<Launched> {
        let launch = self.engine.launch_with_reconciliation(asset, progress, choices);
        guarded("launch_with_reconciliation", launch, |launched: &Launched| match launched.pid {
            Some(pid) => format!("emulator started (pid {pid})"),
            None => "emulator started".to_string(),
        })
        .await
    }

    pub async fn delete_cached(&self, id: u64) -> Response<bool> {
        guarded("delete_cached", self.engine.delete_cached(id), |deleted| {
            if *deleted { "cache entry deleted" } else { "asset was not cached" }.to_string()
        })
        .await
    }

    pub async fn check_saves(&self, asset: &GameAsset) -> Response<SaveCheck> {
        guarded("check_saves", self.engine.check_saves(asset), |_| "saves checked".to_string()).await
    }

    pub async fn recover_orphaned_saves(&self) -> Response<usize> {
        guarded("recover_orphaned_saves", self.engine.recover_orphaned_saves(), |count| {
            format!("recovered {count} session(s)")
        })
        .await
    }

    pub async fn configure_emulator(&self, kind: EmulatorKind) -> Response<Option<u32>> {
        guarded("configure_emulator", self.engine.configure_emulator(kind), |_| format!("{kind} opened for configuration"))
            .await
    }
}

async fn guarded<T, F, M>(operation: &'static str, future: F, message: M) -> Response<T>
where
    F: Future<Output = Result<T>>,
    M: FnOnce(&T) -> String,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(data)) => {
            let message = message(&data);
            Response::ok(data, message)
        },
        Ok(Err(err)) => {
            tracing::warn!(operation, error = ?err, "Operation failed");
            Response::failure((*err).to_string())
        },
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::error!(operation, reason, "Operation panicked");
            Response::failure(format!("internal error: {reason}"))
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_guarded_success() {
        let response = guarded("op", async { Ok(3) }, |n| format!("got {n}")).await;
        assert_eq!(response, Response::ok(3, "got 3"));
    }

    #[tokio::test]
    async fn test_guarded_error_becomes_message() {
        let future = async { Err::<u8, _>(exn::Exn::from(ErrorKind::NoEmulatorForPlatform("snes".to_string()))) };
        let response = guarded("op", future, |_| String::new()).await;
        assert!(!response.success);
        assert_eq!(response.message, "no emulator configured for platform snes");
        assert_eq!(response.data, None);
    }

    #[tokio::test]
    async fn test_guarded_panic_is_caught() {
        let future = async {
            if true {
                panic!("boom");
            }
            Ok(1)
        };
        let response = guarded("op", future, |_| String::new()).await;
        assert_eq!(response, Response::failure("internal error: boom"));
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_value(Response::ok(SaveCheck { has_local: true, has_cloud: false }, "ok")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "message": "ok", "data": {"has_local": true, "has_cloud": false}})
        );
    }
}
