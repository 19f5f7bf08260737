//! [`RemoteInteractor`]: the uniform CRUD contract over a file-per-peer
//! remote registry (§4.4), implemented by the `gitlab` and `git` backends.

use async_trait::async_trait;
use sparrow_core::{GlobalTarget, RegistryFile};
use tokio_util::sync::CancellationToken;

use crate::error::InteractorError;

/// A backend that stores one [`RegistryFile`] per peer, named `{name}.json`.
///
/// Mirrors `kube_client::Api<K>`'s role as the uniform surface a controller
/// talks to regardless of which concrete remote it is backed by.
#[async_trait]
pub trait RemoteInteractor: Send + Sync {
    /// List every peer entry currently in the remote store, paginating
    /// through the backend's listing until exhausted.
    async fn fetch_files(&self, cancel: &CancellationToken) -> Result<Vec<GlobalTarget>, InteractorError>;

    /// Create a new registry file. Fails if one with the same name exists.
    async fn post_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError>;

    /// Update an existing registry file in place.
    async fn put_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError>;

    /// Remove a registry file. `file.name` must be non-empty.
    async fn delete_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError>;
}
