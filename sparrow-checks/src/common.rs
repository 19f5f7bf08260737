//! Shared across the concrete probes: the per-tick target loop and the
//! interval-driven run loop every [`sparrow_runtime::Check`] impl wraps
//! around its own probe function (§4.1).

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use schemars::JsonSchema;
use serde::Serialize;
use sparrow_core::{CheckResult, CheckSchema, CoreError, RetryConfig, TracerouteConfig, UrlCheckConfig};
use sparrow_runtime::backoff::probe_with_retry;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Rejects a config whose `interval`/`timeout`/target count can't drive
/// [`drive`]: a zero `interval` would hand `tokio::time::interval` a zero
/// period, which panics.
pub fn validate_url_config(config: &UrlCheckConfig) -> Result<(), CoreError> {
    if config.interval.is_zero() {
        return Err(CoreError::InvalidConfig {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if config.timeout.is_zero() {
        return Err(CoreError::InvalidConfig {
            field: "timeout".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if config.targets.is_empty() {
        return Err(CoreError::InvalidConfig {
            field: "targets".into(),
            reason: "must declare at least one target".into(),
        });
    }
    Ok(())
}

/// Same validation as [`validate_url_config`], for the traceroute kind's
/// distinct config type.
pub fn validate_traceroute_config(config: &TracerouteConfig) -> Result<(), CoreError> {
    if config.interval.is_zero() {
        return Err(CoreError::InvalidConfig {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if config.timeout.is_zero() {
        return Err(CoreError::InvalidConfig {
            field: "timeout".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if config.targets.is_empty() {
        return Err(CoreError::InvalidConfig {
            field: "targets".into(),
            reason: "must declare at least one target".into(),
        });
    }
    Ok(())
}

/// The `data` shape every concrete check publishes: per-target outcomes
/// keyed by the target's string form, typed by the check's own result type.
#[derive(Debug, Serialize, JsonSchema)]
pub struct TickData<T> {
    pub results: BTreeMap<String, T>,
}

/// Run `probe` against every target under the shared timeout/retry
/// discipline, folding per-target outcomes into one [`CheckResult`].
///
/// A target's failure (after exhausting retries) is recorded in the joined
/// `err` field and simply omitted from `results`; it never aborts the other
/// targets' probes (§4.1).
pub async fn tick<T, F, Fut>(
    targets: &[String],
    timeout: Duration,
    retry: &RetryConfig,
    cancel: &CancellationToken,
    mut probe: F,
) -> CheckResult
where
    T: Serialize,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut results = BTreeMap::new();
    let mut errors = Vec::new();
    for target in targets {
        let owned = target.clone();
        match probe_with_retry(timeout, retry, cancel, || probe(owned.clone())).await {
            Ok(value) => {
                results.insert(target.clone(), value);
            }
            Err(err) => errors.push(format!("{target}: {err}")),
        }
    }

    let data = serde_json::to_value(TickData { results }).unwrap_or(serde_json::Value::Null);
    if errors.is_empty() {
        CheckResult::ok(data)
    } else {
        CheckResult::with_errors(errors, data)
    }
}

/// The published schema for a check whose `data` is [`TickData<T>`].
pub fn schema_for<T: JsonSchema>(name: impl Into<String>) -> CheckSchema {
    CheckSchema::for_type::<TickData<T>>(name)
}

/// Drives `run_tick` on every `interval` expiry until `cancel` fires or the
/// sink's receiving end is dropped. Shared body for every check's `run`.
pub async fn drive<F, Fut>(
    interval: Duration,
    cancel: CancellationToken,
    sink: mpsc::Sender<CheckResult>,
    mut run_tick: F,
) -> Result<(), CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CheckResult>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = run_tick().await;
                if sink.send(result).await.is_err() {
                    return Ok(());
                }
            }
            _ = cancel.cancelled() => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, JsonSchema)]
    struct Probe {
        ok: bool,
    }

    #[tokio::test]
    async fn tick_records_successes_and_joins_failures() {
        let targets = vec!["a".to_string(), "b".to_string()];
        let retry = RetryConfig {
            count: 0,
            initial_delay: Duration::from_millis(1),
        };
        let cancel = CancellationToken::new();
        let result = tick(&targets, Duration::from_secs(1), &retry, &cancel, |target| async move {
            if target == "a" {
                Ok(Probe { ok: true })
            } else {
                Err("refused".to_string())
            }
        })
        .await;

        assert_eq!(result.err, "b: refused");
        assert_eq!(result.data["results"]["a"]["ok"], serde_json::Value::Bool(true));
        assert!(result.data["results"].get("b").is_none());
    }

    fn url_config(interval: Duration, timeout: Duration, targets: &[&str]) -> UrlCheckConfig {
        UrlCheckConfig {
            targets: targets.iter().map(|s| s.to_string()).collect(),
            interval,
            timeout,
            retry: Default::default(),
        }
    }

    #[test]
    fn validate_url_config_rejects_zero_interval() {
        let config = url_config(Duration::ZERO, Duration::from_secs(1), &["https://a.example"]);
        let err = validate_url_config(&config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { field, .. } if field == "interval"));
    }

    #[test]
    fn validate_url_config_rejects_zero_timeout() {
        let config = url_config(Duration::from_secs(1), Duration::ZERO, &["https://a.example"]);
        let err = validate_url_config(&config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { field, .. } if field == "timeout"));
    }

    #[test]
    fn validate_url_config_rejects_no_targets() {
        let config = url_config(Duration::from_secs(1), Duration::from_secs(1), &[]);
        let err = validate_url_config(&config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { field, .. } if field == "targets"));
    }

    #[test]
    fn validate_url_config_accepts_well_formed_config() {
        let config = url_config(Duration::from_secs(1), Duration::from_secs(1), &["https://a.example"]);
        assert!(validate_url_config(&config).is_ok());
    }

    #[test]
    fn validate_traceroute_config_rejects_zero_interval() {
        let config = TracerouteConfig {
            targets: vec![sparrow_core::TracerouteTarget {
                addr: "example.com".into(),
                port: 443,
            }],
            interval: Duration::ZERO,
            timeout: Duration::from_secs(1),
            retry: Default::default(),
        };
        let err = validate_traceroute_config(&config).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { field, .. } if field == "interval"));
    }
}
