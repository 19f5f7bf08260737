//! Errors shared across the crate boundary.
//!
//! Mirrors the teacher's layered-enum convention (see `sparrow-client`'s
//! `ClientError`): each crate gets its own `thiserror` enum, and lower-level
//! errors are wrapped with `#[from]`/`#[source]` rather than collapsed into
//! a single catch-all.

use thiserror::Error;

/// Errors raised while building or validating the shared data model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A check's configuration was rejected during `set_config`/validation.
    ///
    /// Not fatal: the previous good configuration remains in force.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig {
        /// The name of the offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A config's declared kind did not match the check it was handed to.
    #[error("config kind mismatch: expected {expected}, got {actual}")]
    ConfigMismatch {
        /// The kind the check implements.
        expected: String,
        /// The kind the config declared.
        actual: String,
    },

    /// Failed to (de)serialize a value crossing a wire boundary.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Failed to parse a duration field.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// Failed to parse a URL field.
    #[error("invalid URL `{0}`: {1}")]
    InvalidUrl(String, #[source] url::ParseError),
}
