//! The concrete [`CheckFactory`] the reconciler uses to turn a desired
//! config update into a live check instance (§4.7 step 2).

use std::sync::Arc;

use sparrow_runtime::check::{Check, CheckConfigUpdate};
use sparrow_runtime::reconciler::CheckFactory;

use crate::dns::DnsCheck;
use crate::health::HealthCheck;
use crate::latency::LatencyCheck;
use crate::traceroute::TracerouteCheck;

/// Builds health/latency/dns/traceroute checks; the only
/// [`CheckFactory`] this crate provides.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckRegistry;

impl CheckFactory for CheckRegistry {
    fn build(&self, name: String, update: CheckConfigUpdate) -> Arc<dyn Check> {
        match update {
            CheckConfigUpdate::Health(config) => Arc::new(HealthCheck::new(name, config)),
            CheckConfigUpdate::Latency(config) => Arc::new(LatencyCheck::new(name, config)),
            CheckConfigUpdate::Dns(config) => Arc::new(DnsCheck::new(name, config)),
            CheckConfigUpdate::Traceroute(config) => Arc::new(TracerouteCheck::new(name, config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparrow_core::UrlCheckConfig;
    use std::time::Duration;

    #[test]
    fn builds_a_check_named_after_its_kind() {
        let registry = CheckRegistry;
        let check = registry.build(
            "health".to_string(),
            CheckConfigUpdate::Health(UrlCheckConfig {
                targets: vec!["https://a.example".into()],
                interval: Duration::from_secs(1),
                timeout: Duration::from_secs(1),
                retry: Default::default(),
            }),
        );
        assert_eq!(check.name(), "health");
    }
}
