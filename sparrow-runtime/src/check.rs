//! The uniform [`Check`] contract every probe implements (§4.1).

use async_trait::async_trait;
use sparrow_core::{CheckKind, CheckResult, CoreError, TracerouteConfig, UrlCheckConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The controller's bookkeeping state for a registered check.
///
/// `{ name, currentConfig, outputChannel, state }` of the spec's Check
/// runtime entity lives in [`crate::controller::ChecksController`]; this
/// enum is the `state` slice of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Registered but `Run` has not yet been spawned.
    Idle,
    /// `Run` is executing.
    Running,
    /// `Shutdown` has been requested; `Run` is winding down.
    Stopping,
}

/// A config update delivered to [`Check::set_config`], tagged with the kind
/// it was declared as so a mismatched kind can be rejected rather than
/// silently misinterpreted.
#[derive(Debug, Clone)]
pub enum CheckConfigUpdate {
    /// Update for a health check.
    Health(UrlCheckConfig),
    /// Update for a latency check.
    Latency(UrlCheckConfig),
    /// Update for a dns check.
    Dns(UrlCheckConfig),
    /// Update for a traceroute check.
    Traceroute(TracerouteConfig),
}

impl CheckConfigUpdate {
    /// The kind this update declares itself as.
    pub fn kind(&self) -> CheckKind {
        match self {
            CheckConfigUpdate::Health(_) => CheckKind::Health,
            CheckConfigUpdate::Latency(_) => CheckKind::Latency,
            CheckConfigUpdate::Dns(_) => CheckKind::Dns,
            CheckConfigUpdate::Traceroute(_) => CheckKind::Traceroute,
        }
    }
}

/// The contract every probe (health, latency, dns, traceroute, ...)
/// implements, dispatched as `Box<dyn Check>` by the checks controller.
#[async_trait]
pub trait Check: Send + Sync {
    /// Stable identifier; also the `/v1/metrics/{name}` path component and
    /// the result store key.
    fn name(&self) -> &str;

    /// Atomically replace this check's configuration. Safe to call while
    /// `run` is executing. Rejects a config declaring the wrong kind or
    /// missing/out-of-range fields without disturbing the prior config.
    fn set_config(&self, config: CheckConfigUpdate) -> Result<(), CoreError>;

    /// Hand the check the channel it must push results to. Called exactly
    /// once, before `run`.
    async fn startup(&self, sink: mpsc::Sender<CheckResult>) -> Result<(), CoreError>;

    /// Execute ticks until `cancel` fires. Must return promptly once
    /// cancellation is observed.
    async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError>;

    /// Idempotent teardown; after this returns, `run` must have returned.
    async fn shutdown(&self, cancel: CancellationToken) -> Result<(), CoreError>;

    /// JSON schema of the `data` field this check's results carry.
    fn schema(&self) -> sparrow_core::CheckSchema;

    /// Prometheus collectors this check contributes while registered.
    fn metric_collectors(&self) -> Vec<Box<dyn prometheus::core::Collector>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn url_config() -> UrlCheckConfig {
        UrlCheckConfig {
            targets: vec!["https://a.example".into()],
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
            retry: Default::default(),
        }
    }

    #[test]
    fn update_kind_matches_variant() {
        assert_eq!(CheckConfigUpdate::Health(url_config()).kind(), CheckKind::Health);
        assert_eq!(CheckConfigUpdate::Latency(url_config()).kind(), CheckKind::Latency);
        assert_eq!(CheckConfigUpdate::Dns(url_config()).kind(), CheckKind::Dns);
    }
}
