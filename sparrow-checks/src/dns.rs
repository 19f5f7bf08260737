//! DNS resolution probe: strips any URL scheme off a target and resolves
//! it as a hostname.

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
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
pub struct DnsOutcome {
    pub addresses: Vec<String>,
}

/// Resolves each target's hostname via a system-configured resolver.
pub struct DnsCheck {
    name: String,
    resolver: TokioAsyncResolver,
    config: RwLock<UrlCheckConfig>,
    sink: Mutex<Option<mpsc::Sender<CheckResult>>>,
    resolved_total: IntCounterVec,
    failed_total: IntCounterVec,
}

impl DnsCheck {
    pub fn new(name: impl Into<String>, config: UrlCheckConfig) -> Self {
        Self {
            name: name.into(),
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
            config: RwLock::new(config),
            sink: Mutex::new(None),
            resolved_total: IntCounterVec::new(
                Opts::new("sparrow_dns_resolved_total", "successful DNS resolutions"),
                &["target"],
            )
            .expect("static metric options are valid"),
            failed_total: IntCounterVec::new(
                Opts::new("sparrow_dns_failed_total", "failed DNS resolutions"),
                &["target"],
            )
            .expect("static metric options are valid"),
        }
    }

    fn snapshot(&self) -> UrlCheckConfig {
        self.config.read().clone()
    }

    async fn probe(&self, host: String) -> Result<DnsOutcome, String> {
        match self.resolver.lookup_ip(host.as_str()).await {
            Ok(lookup) => {
                self.resolved_total.with_label_values(&[&host]).inc();
                Ok(DnsOutcome {
                    addresses: lookup.iter().map(|ip| ip.to_string()).collect(),
                })
            }
            Err(err) => {
                self.failed_total.with_label_values(&[&host]).inc();
                Err(err.to_string())
            }
        }
    }
}

/// Strips a URL scheme off `target`, as §3's peer-enrichment invariant
/// requires for the DNS check's own configured targets too.
fn as_hostname(target: &str) -> String {
    url::Url::parse(target)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| target.to_string())
}

#[async_trait]
impl Check for DnsCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_config(&self, update: CheckConfigUpdate) -> Result<(), CoreError> {
        let CheckConfigUpdate::Dns(new_config) = update else {
            return Err(CoreError::ConfigMismatch {
                expected: CheckKind::Dns.to_string(),
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
            let hosts: Vec<String> = config.targets.iter().map(|t| as_hostname(t)).collect();
            common::tick(&hosts, config.timeout, &config.retry, &cancel, |host| self.probe(host)).await
        })
        .await
    }

    async fn shutdown(&self, _cancel: CancellationToken) -> Result<(), CoreError> {
        Ok(())
    }

    fn schema(&self) -> CheckSchema {
        common::schema_for::<DnsOutcome>(self.name.clone())
    }

    fn metric_collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![Box::new(self.resolved_total.clone()), Box::new(self.failed_total.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_from_url_targets() {
        assert_eq!(as_hostname("https://example.com/path"), "example.com");
        assert_eq!(as_hostname("bare-host.example"), "bare-host.example");
    }

    fn config(targets: &[&str]) -> UrlCheckConfig {
        UrlCheckConfig {
            targets: targets.iter().map(|s| s.to_string()).collect(),
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
            retry: Default::default(),
        }
    }

    #[test]
    fn set_config_rejects_mismatched_kind() {
        let check = DnsCheck::new("dns", config(&["example.com"]));
        let err = check
            .set_config(CheckConfigUpdate::Health(config(&["example.com"])))
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigMismatch { .. }));
    }

    #[test]
    fn set_config_rejects_empty_targets_and_keeps_prior_config() {
        let check = DnsCheck::new("dns", config(&["example.com"]));
        let mut bad = config(&[]);
        bad.targets = Vec::new();
        let err = check.set_config(CheckConfigUpdate::Dns(bad)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { field, .. } if field == "targets"));
        assert_eq!(check.snapshot().targets, vec!["example.com".to_string()]);
    }
}
