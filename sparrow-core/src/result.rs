//! The [`Result`] a check emits on every tick, and the [`ResultRecord`] the
//! store saves it as.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One output of one check tick.
///
/// `err` is empty on success; a non-empty `err` carries the joined
/// per-target failures (§4.1) without aborting the overall tick. `data` is
/// an opaque, check-defined payload — the check publishes its shape via
/// [`crate::CheckSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Result {
    /// When this result was produced.
    pub timestamp: DateTime<Utc>,
    /// Empty string means the tick succeeded for every target.
    #[serde(default)]
    pub err: String,
    /// Check-defined payload.
    pub data: serde_json::Value,
}

impl Result {
    /// Build a successful result with the given payload.
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            err: String::new(),
            data,
        }
    }

    /// Build a result carrying one or more joined per-target errors.
    pub fn with_errors(errors: impl IntoIterator<Item = String>, data: serde_json::Value) -> Self {
        let err = errors.into_iter().collect::<Vec<_>>().join("; ");
        Self {
            timestamp: Utc::now(),
            err,
            data,
        }
    }

    /// True if this tick had no per-target failures.
    pub fn is_success(&self) -> bool {
        self.err.is_empty()
    }
}

/// The unit saved in the result store: a [`Result`] tagged with the owning
/// check's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// The check's stable name.
    pub name: String,
    /// Its most recent result.
    pub result: Result,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_has_empty_err() {
        let r = Result::ok(serde_json::json!({"rtt_ms": 12}));
        assert!(r.is_success());
        assert_eq!(r.err, "");
    }

    #[test]
    fn with_errors_joins_with_semicolon() {
        let r = Result::with_errors(
            vec!["a.example: timeout".to_string(), "b.example: refused".to_string()],
            serde_json::Value::Null,
        );
        assert!(!r.is_success());
        assert_eq!(r.err, "a.example: timeout; b.example: refused");
    }

    #[test]
    fn result_record_round_trips_through_json() {
        let record = ResultRecord {
            name: "health".to_string(),
            result: Result::ok(serde_json::json!({"up": true})),
        };
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: ResultRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(record, decoded);
    }
}
