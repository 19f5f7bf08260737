//! HTTP health probe: a target is up iff its response status is successful.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::{IntCounterVec, Opts};
use schemars::JsonSchema;
use serde::Serialize;
use sparrow_core::{CheckKind, CheckResult, CheckSchema, CoreError, UrlCheckConfig};
use sparrow_runtime::check::{Check, CheckConfigUpdate};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::common;

#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthOutcome {
    pub status: u16,
}

/// Probes each configured target with an HTTP GET; up iff the response
/// status is 2xx.
pub struct HealthCheck {
    name: String,
    client: reqwest::Client,
    config: RwLock<UrlCheckConfig>,
    sink: Mutex<Option<mpsc::Sender<CheckResult>>>,
    up_total: IntCounterVec,
    down_total: IntCounterVec,
}

impl HealthCheck {
    pub fn new(name: impl Into<String>, config: UrlCheckConfig) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            config: RwLock::new(config),
            sink: Mutex::new(None),
            up_total: IntCounterVec::new(
                Opts::new("sparrow_health_up_total", "successful health probes"),
                &["target"],
            )
            .expect("static metric options are valid"),
            down_total: IntCounterVec::new(
                Opts::new("sparrow_health_down_total", "failed health probes"),
                &["target"],
            )
            .expect("static metric options are valid"),
        }
    }

    fn snapshot(&self) -> UrlCheckConfig {
        self.config.read().clone()
    }

    async fn probe(&self, target: String) -> Result<HealthOutcome, String> {
        let resp = self.client.get(&target).send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        if status.is_success() {
            self.up_total.with_label_values(&[&target]).inc();
            Ok(HealthOutcome { status: status.as_u16() })
        } else {
            self.down_total.with_label_values(&[&target]).inc();
            Err(format!("unexpected status {status}"))
        }
    }
}

#[async_trait]
impl Check for HealthCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_config(&self, update: CheckConfigUpdate) -> Result<(), CoreError> {
        let CheckConfigUpdate::Health(new_config) = update else {
            return Err(CoreError::ConfigMismatch {
                expected: CheckKind::Health.to_string(),
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
        common::schema_for::<HealthOutcome>(self.name.clone())
    }

    fn metric_collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![Box::new(self.up_total.clone()), Box::new(self.down_total.clone())]
    }
}
