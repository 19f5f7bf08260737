//! [`GlobalTarget`]: one peer entry in the remote registry (§3, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One peer entry, as stored in a [`crate::RegistryFile`] and as returned by
/// [`crate::CheckSchema`]-adjacent `fetch_files` calls.
///
/// Wire format is `{"url": "...", "lastSeen": "..."}` (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalTarget {
    /// Absolute URL of the peer, e.g. `https://sparrow-eu-1.example`.
    pub url: String,
    /// UTC timestamp of the last time this entry was touched.
    #[serde(rename = "lastSeen")]
    pub last_seen: DateTime<Utc>,
}

impl GlobalTarget {
    /// True if `self.last_seen` is at least `threshold` old relative to `now`.
    ///
    /// A zero threshold means "never stale" (the target manager's
    /// `unhealthy_threshold = 0` disables filtering, §4.5).
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        if threshold.is_zero() {
            return false;
        }
        self.last_seen < now - threshold
    }
}
