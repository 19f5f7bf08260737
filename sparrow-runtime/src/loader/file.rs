//! File-backed [`Loader`] variant: reads a path on an interval; interval
//! zero means "read once and stop" (§4.3).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use sparrow_core::RuntimeConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::Loader;

/// Reads `path` and decodes it as YAML or JSON (YAML is a superset of the
/// wire format's JSON option) into a [`RuntimeConfig`] on every tick.
pub struct FileLoader {
    path: PathBuf,
    interval: Duration,
}

impl FileLoader {
    /// `interval` of [`Duration::ZERO`] reads the file exactly once.
    pub fn new(path: PathBuf, interval: Duration) -> Self {
        Self { path, interval }
    }

    async fn fetch(&self) -> Result<RuntimeConfig, String> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| format!("reading {}: {e}", self.path.display()))?;
        serde_yaml::from_slice(&bytes).map_err(|e| format!("decoding {}: {e}", self.path.display()))
    }
}

#[async_trait]
impl Loader for FileLoader {
    async fn run(&self, cancel: CancellationToken, tx: mpsc::Sender<RuntimeConfig>) {
        loop {
            match self.fetch().await {
                Ok(config) => {
                    if tx.send(config).await.is_err() {
                        return;
                    }
                }
                Err(err) => warn!(error = %err, path = %self.path.display(), "failed to load runtime config"),
            }

            if self.interval.is_zero() {
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }
}
