//! Enriches a [`RuntimeConfig`] with the current peer list and diffs it
//! against the controller's live check set (§4.7).
//!
//! The removals-then-additions ordering mirrors the teacher's `applier`
//! diff step in `kube-runtime/src/controller/mod.rs`: apply the shrink
//! before the grow so a renamed check never double-registers.

use std::sync::Arc;

use indexmap::IndexMap;
use sparrow_core::{CheckKind, GlobalTarget, RuntimeConfig, TracerouteTarget};
use tracing::warn;
use url::Url;

use crate::check::{Check, CheckConfigUpdate};
use crate::controller::ChecksController;

/// Builds a live [`Check`] instance for a desired config update.
///
/// Implemented by the crate assembling the concrete check types (health,
/// latency, dns, traceroute); kept as a trait here so `sparrow-runtime`
/// never depends on `sparrow-checks`.
pub trait CheckFactory: Send + Sync {
    /// Construct the check named `name` for `update`.
    fn build(&self, name: String, update: CheckConfigUpdate) -> Arc<dyn Check>;
}

/// Drives reconciliation of one [`RuntimeConfig`] against a
/// [`ChecksController`].
pub struct Reconciler<F> {
    controller: Arc<ChecksController>,
    factory: F,
    own_url: String,
}

impl<F: CheckFactory> Reconciler<F> {
    /// `own_url` is excluded from every enriched target list.
    pub fn new(controller: Arc<ChecksController>, factory: F, own_url: String) -> Self {
        Self {
            controller,
            factory,
            own_url,
        }
    }

    /// Enrich `config` with `peers`, then register/reconfigure/unregister
    /// checks on the controller to match.
    pub async fn reconcile(&self, config: RuntimeConfig, peers: &[GlobalTarget]) {
        let desired = self.enrich(config, peers);
        self.apply(desired).await;
    }

    fn enrich(&self, config: RuntimeConfig, peers: &[GlobalTarget]) -> IndexMap<String, CheckConfigUpdate> {
        let mut desired = IndexMap::new();

        let peer_urls: Vec<&str> = peers
            .iter()
            .map(|p| p.url.as_str())
            .filter(|url| *url != self.own_url)
            .collect();

        if let Some(mut health) = config.health {
            health.targets = union_urls(health.targets, &peer_urls);
            desired.insert(CheckKind::Health.to_string(), CheckConfigUpdate::Health(health));
        }
        if let Some(mut latency) = config.latency {
            latency.targets = union_urls(latency.targets, &peer_urls);
            desired.insert(CheckKind::Latency.to_string(), CheckConfigUpdate::Latency(latency));
        }
        if let Some(mut dns) = config.dns {
            let hosts: Vec<String> = peer_urls.iter().map(|url| strip_scheme(url)).collect();
            dns.targets = union_urls(dns.targets, &hosts.iter().map(String::as_str).collect::<Vec<_>>());
            desired.insert(CheckKind::Dns.to_string(), CheckConfigUpdate::Dns(dns));
        }
        if let Some(mut traceroute) = config.traceroute {
            let peer_targets: Vec<TracerouteTarget> = peer_urls.iter().filter_map(|url| traceroute_target(url)).collect();
            traceroute.targets = union_traceroute_targets(traceroute.targets, peer_targets);
            desired.insert(CheckKind::Traceroute.to_string(), CheckConfigUpdate::Traceroute(traceroute));
        }

        desired
    }

    async fn apply(&self, desired: IndexMap<String, CheckConfigUpdate>) {
        let current = self.controller.names().await;

        let removals: Vec<String> = current.iter().filter(|name| !desired.contains_key(*name)).cloned().collect();
        for name in removals {
            self.controller.unregister(&name).await;
        }

        for (name, update) in desired {
            if current.contains(&name) {
                if let Some(Err(err)) = self.controller.set_config(&name, update).await {
                    warn!(check = %name, error = %err, "rejected runtime config update");
                }
                continue;
            }
            let check = self.factory.build(name.clone(), update);
            if let Err(err) = self.controller.register(check).await {
                warn!(check = %name, error = %err, "failed to register check");
            }
        }
    }
}

/// Configured targets first, then peer-derived ones, deduplicated while
/// preserving that order.
fn union_urls(configured: Vec<String>, peers: &[&str]) -> Vec<String> {
    let mut seen: std::collections::HashSet<String> = configured.iter().cloned().collect();
    let mut union = configured;
    for peer in peers {
        if seen.insert((*peer).to_string()) {
            union.push((*peer).to_string());
        }
    }
    union
}

fn union_traceroute_targets(configured: Vec<TracerouteTarget>, peers: Vec<TracerouteTarget>) -> Vec<TracerouteTarget> {
    let mut seen: std::collections::HashSet<(String, u16)> =
        configured.iter().map(|t| (t.addr.clone(), t.port)).collect();
    let mut union = configured;
    for peer in peers {
        if seen.insert((peer.addr.clone(), peer.port)) {
            union.push(peer);
        }
    }
    union
}

fn strip_scheme(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

fn traceroute_target(url: &str) -> Option<TracerouteTarget> {
    let parsed = Url::parse(url).ok()?;
    let addr = parsed.host_str()?.to_string();
    let port = parsed.port_or_known_default().unwrap_or(80);
    Some(TracerouteTarget { addr, port })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sparrow_core::{CheckResult, CoreError, UrlCheckConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct StubCheck {
        name: String,
    }

    #[async_trait]
    impl Check for StubCheck {
        fn name(&self) -> &str {
            &self.name
        }
        fn set_config(&self, _update: CheckConfigUpdate) -> Result<(), CoreError> {
            Ok(())
        }
        async fn startup(&self, _sink: mpsc::Sender<CheckResult>) -> Result<(), CoreError> {
            Ok(())
        }
        async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError> {
            cancel.cancelled().await;
            Ok(())
        }
        async fn shutdown(&self, _cancel: CancellationToken) -> Result<(), CoreError> {
            Ok(())
        }
        fn schema(&self) -> sparrow_core::CheckSchema {
            sparrow_core::CheckSchema::for_type::<serde_json::Value>(self.name.clone())
        }
        fn metric_collectors(&self) -> Vec<Box<dyn prometheus::core::Collector>> {
            Vec::new()
        }
    }

    struct CountingFactory {
        builds: AtomicUsize,
    }

    impl CheckFactory for CountingFactory {
        fn build(&self, name: String, _update: CheckConfigUpdate) -> Arc<dyn Check> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Arc::new(StubCheck { name })
        }
    }

    fn url_config(targets: &[&str]) -> UrlCheckConfig {
        UrlCheckConfig {
            targets: targets.iter().map(|s| s.to_string()).collect(),
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
            retry: Default::default(),
        }
    }

    #[test]
    fn enrich_unions_peers_excluding_self_and_preserves_order() {
        let controller = Arc::new(ChecksController::new(
            crate::store::Writer::default(),
            crate::metrics::MetricsRegistry::new(),
        ));
        let factory = CountingFactory {
            builds: AtomicUsize::new(0),
        };
        let reconciler = Reconciler::new(controller, factory, "https://self.example".into());

        let config = RuntimeConfig {
            health: Some(url_config(&["https://configured.example"])),
            latency: None,
            dns: None,
            traceroute: None,
        };
        let peers = vec![
            GlobalTarget {
                url: "https://self.example".into(),
                last_seen: chrono::Utc::now(),
            },
            GlobalTarget {
                url: "https://peer.example".into(),
                last_seen: chrono::Utc::now(),
            },
        ];

        let desired = reconciler.enrich(config, &peers);
        let health = match desired.get("health").unwrap() {
            CheckConfigUpdate::Health(c) => c,
            _ => panic!("expected health update"),
        };
        assert_eq!(
            health.targets,
            vec!["https://configured.example".to_string(), "https://peer.example".to_string()]
        );
    }

    #[tokio::test]
    async fn apply_removes_before_adding_and_reconfigures_in_place() {
        let controller = Arc::new(ChecksController::new(
            crate::store::Writer::default(),
            crate::metrics::MetricsRegistry::new(),
        ));
        let factory = CountingFactory {
            builds: AtomicUsize::new(0),
        };
        controller.register(Arc::new(StubCheck { name: "health".into() })).await.unwrap();
        controller.register(Arc::new(StubCheck { name: "dns".into() })).await.unwrap();

        let reconciler = Reconciler::new(controller.clone(), factory, "https://self.example".into());
        let mut desired = IndexMap::new();
        desired.insert(
            "health".to_string(),
            CheckConfigUpdate::Health(url_config(&["https://a.example"])),
        );
        desired.insert(
            "latency".to_string(),
            CheckConfigUpdate::Latency(url_config(&["https://b.example"])),
        );
        reconciler.apply(desired).await;

        let names = controller.names().await;
        assert!(names.contains(&"health".to_string()));
        assert!(names.contains(&"latency".to_string()));
        assert!(!names.contains(&"dns".to_string()));
        assert_eq!(reconciler.factory.builds.load(Ordering::SeqCst), 1);
    }
}
