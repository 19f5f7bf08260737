//! HTTP-backed [`Loader`] variant: GETs a URL on an interval, with an
//! optional bearer token and retry-with-backoff on transient failures
//! (§4.3).

use std::time::Duration;

use async_trait::async_trait;
use sparrow_client::retry_with_backoff;
use sparrow_core::{RetryConfig, RuntimeConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::Loader;

/// Configuration for [`HttpLoader`].
#[derive(Debug, Clone)]
pub struct HttpLoaderConfig {
    /// URL to GET on every tick. Must be non-empty.
    pub url: String,
    /// How often to poll.
    pub interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Optional bearer token sent as `Authorization: Bearer {token}`.
    pub bearer_token: Option<String>,
    /// Retry policy applied to transient (network/5xx) failures.
    pub retry: RetryConfig,
}

/// Polls `config.url` for a YAML- or JSON-encoded [`RuntimeConfig`].
pub struct HttpLoader {
    client: reqwest::Client,
    config: HttpLoaderConfig,
}

impl HttpLoader {
    /// Build a new loader. Fails if `config.url` is empty.
    pub fn new(config: HttpLoaderConfig) -> Result<Self, String> {
        if config.url.is_empty() {
            return Err("http loader url must not be empty".to_string());
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| format!("building http client: {e}"))?;
        Ok(Self { client, config })
    }

    async fn fetch_once(&self) -> Result<bytes::Bytes, String> {
        let mut req = self.client.get(&self.config.url);
        if let Some(token) = &self.config.bearer_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| format!("request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("unexpected status {}", resp.status()));
        }
        resp.bytes().await.map_err(|e| format!("reading body: {e}"))
    }

    async fn fetch_with_retry(&self, cancel: &CancellationToken) -> Result<RuntimeConfig, String> {
        let body = retry_with_backoff(&self.config.retry, cancel, || self.fetch_once()).await?;
        serde_yaml::from_slice(&body).map_err(|e| format!("decoding response: {e}"))
    }
}

#[async_trait]
impl Loader for HttpLoader {
    async fn run(&self, cancel: CancellationToken, tx: mpsc::Sender<RuntimeConfig>) {
        loop {
            match self.fetch_with_retry(&cancel).await {
                Ok(config) => {
                    if tx.send(config).await.is_err() {
                        return;
                    }
                }
                Err(err) => warn!(error = %err, url = %self.config.url, "failed to load runtime config"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }
}
