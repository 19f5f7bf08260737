//! Process-wide Prometheus registry, shared across every registered check.
//!
//! Checks register their collectors on `Register` and unregister them on
//! `Unregister` (§4.6, §5) so a check cycling through reconfiguration never
//! hits a duplicate-registration error.

use prometheus::core::Collector;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::warn;

/// Thin wrapper over a [`Registry`] with the controller's
/// register-on-Register/unregister-on-Unregister discipline.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Registry,
}

impl MetricsRegistry {
    /// A fresh, empty registry.
    pub fn new() -> Self {
        Self {
            inner: Registry::new(),
        }
    }

    /// Register every collector a check contributes. A failure for one
    /// collector does not prevent attempting the rest; it is logged.
    pub fn register_all(&self, collectors: Vec<Box<dyn Collector>>) {
        for collector in collectors {
            if let Err(err) = self.inner.register(collector) {
                warn!(error = %err, "failed to register check metric collector");
            }
        }
    }

    /// Unregister collectors directly, mirroring the handles passed to
    /// [`Self::register_all`].
    pub fn unregister_all(&self, collectors: Vec<Box<dyn Collector>>) {
        for collector in collectors {
            if let Err(err) = self.inner.unregister(collector) {
                warn!(error = %err, "failed to unregister check metric collector");
            }
        }
    }

    /// Render the current registry in Prometheus text exposition format,
    /// for `GET /metrics`.
    pub fn gather_text(&self) -> Result<String, String> {
        let families = self.inner.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| format!("encoding metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics output was not valid utf-8: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::IntCounter;

    #[test]
    fn register_then_unregister_allows_reregistration() {
        let registry = MetricsRegistry::new();
        let counter = IntCounter::new("sparrow_test_total", "test counter").unwrap();
        registry.register_all(vec![Box::new(counter.clone())]);
        registry.unregister_all(vec![Box::new(counter.clone())]);

        let counter2 = IntCounter::new("sparrow_test_total", "test counter").unwrap();
        registry.register_all(vec![Box::new(counter2)]);
        assert!(registry.gather_text().unwrap().contains("sparrow_test_total"));
    }
}
