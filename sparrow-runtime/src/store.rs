//! The result store: a concurrent, keyed cache of each check's latest
//! [`CheckResult`] (§4.2).
//!
//! Split into a [`Writer`] (exclusive, owned by the controller) and a
//! cloneable [`Store`] (handed out to the HTTP API), mirroring the
//! reflector's writer/reader split over a shared [`DashMap`].

use std::sync::Arc;

use dashmap::DashMap;
use sparrow_core::{CheckResult, ResultRecord};

/// The exclusive write handle into the result store.
///
/// Only the controller holds one; readers go through [`Writer::as_reader`].
/// Cloneable so the controller can hand a handle to each check's internal
/// result-forwarding task without exposing `save` outside the crate.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    store: Arc<DashMap<String, CheckResult>>,
}

impl Writer {
    /// Hand out a new read-only handle onto the same backing map.
    #[must_use]
    pub fn as_reader(&self) -> Store {
        Store {
            store: self.store.clone(),
        }
    }

    /// Upsert a check's latest result, replacing any prior one under the
    /// same name.
    pub fn save(&self, record: ResultRecord) {
        self.store.insert(record.name, record.result);
    }
}

/// A cloneable, read-only view of the result store.
#[derive(Debug, Clone, Default)]
pub struct Store {
    store: Arc<DashMap<String, CheckResult>>,
}

impl Store {
    /// Look up a single check's latest result.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<CheckResult> {
        self.store.get(name).map(|entry| entry.value().clone())
    }

    /// A deep-copied snapshot of every check's latest result, so callers
    /// cannot mutate the store's internal state through the returned map.
    #[must_use]
    pub fn list(&self) -> std::collections::HashMap<String, CheckResult> {
        self.store
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(data: serde_json::Value) -> CheckResult {
        CheckResult::ok(data)
    }

    #[test]
    fn save_replaces_prior_result_for_same_name() {
        let writer = Writer::default();
        writer.save(ResultRecord {
            name: "health".into(),
            result: result(serde_json::json!({"up": true})),
        });
        writer.save(ResultRecord {
            name: "health".into(),
            result: result(serde_json::json!({"up": false})),
        });
        let store = writer.as_reader();
        let latest = store.get("health").unwrap();
        assert_eq!(latest.data, serde_json::json!({"up": false}));
    }

    #[test]
    fn list_returns_snapshot_disjoint_from_store() {
        let writer = Writer::default();
        writer.save(ResultRecord {
            name: "dns".into(),
            result: result(serde_json::Value::Null),
        });
        let store = writer.as_reader();
        let mut snapshot = store.list();
        snapshot.insert("dns".into(), result(serde_json::json!({"tampered": true})));
        assert_eq!(
            store.get("dns").unwrap().data,
            serde_json::Value::Null,
            "mutating the returned snapshot must not affect the store"
        );
    }

    #[test]
    fn get_on_missing_name_returns_none() {
        let writer = Writer::default();
        let store = writer.as_reader();
        assert!(store.get("missing").is_none());
    }
}
