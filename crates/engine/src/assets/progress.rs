use serde::Serialize;
use tokio::sync::mpsc;

/// One download progress update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub asset_id: u64,
    /// The file currently downloading, if any.
    pub file: Option<String>,
    pub bytes_downloaded: u64,
    pub bytes_total: u64,
    pub percent: f64,
    /// The cache was already valid; nothing was downloaded.
    pub already_available: bool,
}
impl Progress {
    pub(crate) fn already_available(asset_id: u64) -> Self {
        Self { asset_id, file: None, bytes_downloaded: 0, bytes_total: 0, percent: 100.0, already_available: true }
    }

    pub(crate) fn downloading(asset_id: u64, file: &str, bytes_downloaded: u64, bytes_total: u64) -> Self {
        let percent = if bytes_total == 0 {
            0.0
        } else {
            (bytes_downloaded as f64 / bytes_total as f64 * 100.0).min(100.0)
        };
        Self {
            asset_id,
            file: Some(file.to_string()),
            bytes_downloaded,
            bytes_total,
            percent,
            already_available: false,
        }
    }

    pub(crate) fn complete(asset_id: u64, bytes: u64) -> Self {
        Self {
            asset_id,
            file: None,
            bytes_downloaded: bytes,
            bytes_total: bytes,
            percent: 100.0,
            already_available: false,
        }
    }
}

/// Where progress updates go. Dropped receivers are ignored.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink(Option<mpsc::UnboundedSender<Progress>>);
impl ProgressSink {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(Some(tx)), rx)
    }

    pub(crate) fn emit(&self, progress: Progress) {
        if let Some(tx) = &self.0 {
            _ = tx.send(progress);
        }
    }
}
