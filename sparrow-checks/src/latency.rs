//! HTTP latency probe: measures round-trip time of a GET against each
//! target, failing the target if the response is not successful.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec};
use schemars::JsonSchema;
use serde::Serialize;
use sparrow_core::{CheckKind, CheckResult, CheckSchema, CoreError, UrlCheckConfig};
use sparrow_runtime::check::{Check, CheckConfigUpdate};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::common;

#[derive(Debug, Serialize, JsonSchema)]
pub struct LatencyOutcome {
    pub rtt_ms: f64,
}

/// Probes each target with an HTTP GET, recording round-trip time.
pub struct LatencyCheck {
    name: String,
    client: reqwest::Client,
    config: RwLock<UrlCheckConfig>,
    sink: Mutex<Option<mpsc::Sender<CheckResult>>>,
    rtt: HistogramVec,
}

impl LatencyCheck {
    pub fn new(name: impl Into<String>, config: UrlCheckConfig) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            config: RwLock::new(config),
            sink: Mutex::new(None),
            rtt: HistogramVec::new(
                HistogramOpts::new("sparrow_latency_rtt_ms", "probe round-trip time in milliseconds"),
                &["target"],
            )
            .expect("static metric options are valid"),
        }
    }

    fn snapshot(&self) -> UrlCheckConfig {
        self.config.read().clone()
    }

    async fn probe(&self, target: String) -> Result<LatencyOutcome, String> {
        let start = Instant::now();
        let resp = self.client.get(&target).send().await.map_err(|e| e.to_string())?;
        let rtt_ms = start.elapsed().as_secs_f64() * 1000.0;
        if !resp.status().is_success() {
            return Err(format!("unexpected status {}", resp.status()));
        }
        self.rtt.with_label_values(&[&target]).observe(rtt_ms);
        Ok(LatencyOutcome { rtt_ms })
    }
}

#[async_trait]
impl Check for LatencyCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_config(&self, update: CheckConfigUpdate) -> Result<(), CoreError> {
        let CheckConfigUpdate::Latency(new_config) = update else {
            return Err(CoreError::ConfigMismatch {
                expected: CheckKind::Latency.to_string(),
                actual: update.kind().to_string(),
            });
        };
        common::validate_url_config(&new_config)?;
        *self.config.write() = new_config;
        Ok(())
    }

    async fn startup(&self, sink: mpsc::Sender<CheckResult>) -> Result<(), CoreError> {
        *self.sink.lock().await = Some(sink);
        Ok(())
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError> {
        let sink = self.sink.lock().await.clone().ok_or_else(|| CoreError::InvalidConfig {
            field: "sink".into(),
            reason: "startup was not called before run".into(),
        })?;
        let interval = self.snapshot().interval;
        common::drive(interval, cancel.clone(), sink, || async {
            let config = self.snapshot();
            common::tick(&config.targets, config.timeout, &config.retry, &cancel, |target| self.probe(target)).await
        })
        .await
    }

    async fn shutdown(&self, _cancel: CancellationToken) -> Result<(), CoreError> {
        Ok(())
    }

    fn schema(&self) -> CheckSchema {
        common::schema_for::<LatencyOutcome>(self.name.clone())
    }

    fn metric_collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![Box::new(self.rtt.clone())]
    }
}
