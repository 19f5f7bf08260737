//! Errors raised by the remote registry backends.

use thiserror::Error;

/// Errors from a [`crate::RemoteInteractor`] backend.
#[derive(Debug, Error)]
pub enum InteractorError {
    /// The requested registry file does not exist in the remote store.
    #[error("registry file `{0}` not found")]
    NotFound(String),

    /// The remote HTTP endpoint returned a non-success status.
    #[error("remote registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A git operation against the local checkout failed.
    #[error("git backend error: {0}")]
    Git(#[from] git2::Error),

    /// Failed to (de)serialize a registry file.
    #[error("registry file (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    /// Local filesystem I/O failed while staging a checkout.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend was misconfigured (empty URL, missing token, ...).
    #[error("invalid interactor configuration: {0}")]
    InvalidConfig(String),
}

/// Top-level client error, wrapping backend- and retry-specific failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A registry backend operation failed after exhausting its retry budget.
    #[error(transparent)]
    Interactor(#[from] InteractorError),
}
