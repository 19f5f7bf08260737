//! [`RuntimeConfig`]: the record the [`Loader`](../../sparrow_runtime/loader/index.html)
//! produces and the reconciler diffs against the controller's live check set (§3, §4.7).

use std::{fmt, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Exponential-backoff retry policy for a single check tick (§4.1).
///
/// Attempt `n` (1-indexed) sleeps `initial_delay * 2^(n-1)` before retrying;
/// at most `count` retries are attempted, so `count = 0` means "try once,
/// never retry".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    #[serde(default)]
    pub count: u32,
    /// Delay before the first retry; doubles on each subsequent attempt.
    #[serde(rename = "delay", default = "default_initial_delay", with = "humantime_serde")]
    #[schemars(with = "String")]
    pub initial_delay: Duration,
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            count: 0,
            initial_delay: default_initial_delay(),
        }
    }
}

impl RetryConfig {
    /// The delay before retry attempt `n` (1-indexed).
    pub fn delay_for_attempt(&self, n: u32) -> Duration {
        self.initial_delay.saturating_mul(1u32 << n.saturating_sub(1).min(31))
    }
}

/// The check kinds a [`RuntimeConfig`] may carry (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// HTTP(S) reachability probe.
    Health,
    /// Round-trip latency probe.
    Latency,
    /// DNS resolution probe.
    Dns,
    /// TCP-connect traceroute-lite probe.
    Traceroute,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckKind::Health => "health",
            CheckKind::Latency => "latency",
            CheckKind::Dns => "dns",
            CheckKind::Traceroute => "traceroute",
        };
        f.write_str(s)
    }
}

/// Shared fields carried by the health, latency and dns check kinds, whose
/// targets are plain URL/hostname strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UrlCheckConfig {
    /// Targets to probe; for `dns` these are hostnames, otherwise URLs.
    #[serde(default)]
    pub targets: Vec<String>,
    /// How often to run a tick.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub interval: Duration,
    /// Overall per-tick timeout.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub timeout: Duration,
    /// Retry policy applied per-target within a tick.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// One traceroute destination: a host and the port to probe against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TracerouteTarget {
    /// Hostname or IP address.
    pub addr: String,
    /// TCP port to probe.
    pub port: u16,
}

/// Traceroute-kind configuration; its targets carry a port, unlike the other
/// kinds' plain URL/hostname targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TracerouteConfig {
    /// Destinations to probe.
    #[serde(default)]
    pub targets: Vec<TracerouteTarget>,
    /// How often to run a tick.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub interval: Duration,
    /// Overall per-tick timeout.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub timeout: Duration,
    /// Retry policy applied per-target within a tick.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// A runtime-config update, as produced by the [`Loader`](../../sparrow_runtime/loader/index.html)
/// and consumed by the reconciler (§3).
///
/// "Empty config" means every slot is `None`; the reconciler then unregisters
/// every running check (§9 Open Question).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeConfig {
    /// HTTP(S) reachability probe configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<UrlCheckConfig>,
    /// Round-trip latency probe configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<UrlCheckConfig>,
    /// DNS resolution probe configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<UrlCheckConfig>,
    /// Traceroute-lite probe configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceroute: Option<TracerouteConfig>,
}

impl RuntimeConfig {
    /// True if every check-kind slot is `None` (§9 Open Question: an empty
    /// config unregisters every active check).
    pub fn is_empty(&self) -> bool {
        self.health.is_none() && self.latency.is_none() && self.dns.is_none() && self.traceroute.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_reports_empty() {
        assert!(RuntimeConfig::default().is_empty());
    }

    #[test]
    fn non_empty_when_any_slot_set() {
        let cfg = RuntimeConfig {
            health: Some(UrlCheckConfig {
                targets: vec!["https://a.example".into()],
                interval: Duration::from_secs(1),
                timeout: Duration::from_secs(1),
                retry: RetryConfig::default(),
            }),
            ..Default::default()
        };
        assert!(!cfg.is_empty());
    }

    #[test]
    fn retry_delay_doubles_per_attempt() {
        let retry = RetryConfig {
            count: 5,
            initial_delay: Duration::from_millis(100),
        };
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn runtime_config_parses_from_wire_shape() {
        let json = serde_json::json!({
            "health": {
                "targets": ["https://a.example"],
                "interval": "10s",
                "timeout": "2s",
                "retry": {"count": 3, "delay": "500ms"}
            }
        });
        let cfg: RuntimeConfig = serde_json::from_value(json).unwrap();
        let health = cfg.health.expect("health slot set");
        assert_eq!(health.targets, vec!["https://a.example".to_string()]);
        assert_eq!(health.interval, Duration::from_secs(10));
        assert_eq!(health.retry.count, 3);
        assert_eq!(health.retry.initial_delay, Duration::from_millis(500));
        assert!(cfg.latency.is_none());
    }
}
