//! Traceroute-lite probe: a TCP-connect reachability check against each
//! `{addr, port}` destination.
//!
//! Full ICMP traceroute is explicitly out of scope (raw sockets need
//! elevated privileges the agent should not require); a successful TCP
//! handshake to the destination port is treated as "reachable" and its
//! connect time as the headline latency.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec};
use schemars::JsonSchema;
use serde::Serialize;
use sparrow_core::{CheckKind, CheckResult, CheckSchema, CoreError, TracerouteConfig};
use sparrow_runtime::check::{Check, CheckConfigUpdate};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::common;

#[derive(Debug, Serialize, JsonSchema)]
pub struct TracerouteOutcome {
    pub connect_ms: f64,
}

/// Probes each `{addr, port}` destination with a TCP connect attempt.
pub struct TracerouteCheck {
    name: String,
    config: RwLock<TracerouteConfig>,
    sink: Mutex<Option<mpsc::Sender<CheckResult>>>,
    connect_time: HistogramVec,
}

impl TracerouteCheck {
    pub fn new(name: impl Into<String>, config: TracerouteConfig) -> Self {
        Self {
            name: name.into(),
            config: RwLock::new(config),
            sink: Mutex::new(None),
            connect_time: HistogramVec::new(
                HistogramOpts::new("sparrow_traceroute_connect_ms", "TCP connect time in milliseconds"),
                &["destination"],
            )
            .expect("static metric options are valid"),
        }
    }

    fn snapshot(&self) -> TracerouteConfig {
        self.config.read().clone()
    }

    async fn probe(&self, destination: String) -> Result<TracerouteOutcome, String> {
        let start = Instant::now();
        TcpStream::connect(&destination).await.map_err(|e| e.to_string())?;
        let connect_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.connect_time.with_label_values(&[&destination]).observe(connect_ms);
        Ok(TracerouteOutcome { connect_ms })
    }
}

#[async_trait]
impl Check for TracerouteCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_config(&self, update: CheckConfigUpdate) -> Result<(), CoreError> {
        let CheckConfigUpdate::Traceroute(new_config) = update else {
            return Err(CoreError::ConfigMismatch {
                expected: CheckKind::Traceroute.to_string(),
                actual: update.kind().to_string(),
            });
        };
        common::validate_traceroute_config(&new_config)?;
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
            let destinations: Vec<String> = config.targets.iter().map(|t| format!("{}:{}", t.addr, t.port)).collect();
            common::tick(&destinations, config.timeout, &config.retry, &cancel, |destination| self.probe(destination)).await
        })
        .await
    }

    async fn shutdown(&self, _cancel: CancellationToken) -> Result<(), CoreError> {
        Ok(())
    }

    fn schema(&self) -> CheckSchema {
        common::schema_for::<TracerouteOutcome>(self.name.clone())
    }

    fn metric_collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![Box::new(self.connect_time.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparrow_core::TracerouteTarget;

    fn config(targets: &[(&str, u16)]) -> TracerouteConfig {
        TracerouteConfig {
            targets: targets
                .iter()
                .map(|(addr, port)| TracerouteTarget {
                    addr: addr.to_string(),
                    port: *port,
                })
                .collect(),
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
            retry: Default::default(),
        }
    }

    #[test]
    fn set_config_rejects_mismatched_kind() {
        let check = TracerouteCheck::new("traceroute", config(&[("example.com", 443)]));
        let err = check
            .set_config(CheckConfigUpdate::Health(sparrow_core::UrlCheckConfig {
                targets: vec!["https://a.example".into()],
                interval: Duration::from_secs(1),
                timeout: Duration::from_secs(1),
                retry: Default::default(),
            }))
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigMismatch { .. }));
    }

    #[test]
    fn set_config_rejects_zero_interval_and_keeps_prior_config() {
        let check = TracerouteCheck::new("traceroute", config(&[("example.com", 443)]));
        let mut bad = config(&[("other.example", 80)]);
        bad.interval = Duration::ZERO;
        let err = check.set_config(CheckConfigUpdate::Traceroute(bad)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { field, .. } if field == "interval"));
        assert_eq!(check.snapshot().targets[0].addr, "example.com");
    }
}
