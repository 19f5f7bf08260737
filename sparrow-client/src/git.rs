//! Git-backed [`RemoteInteractor`]: clones into a scoped checkout, syncs via
//! pull, and commits/pushes writes (§4.4).
//!
//! `git2` has no in-process virtual filesystem backend, so "clones into an
//! in-memory filesystem" is implemented as a real checkout scoped to a
//! [`TempDir`] that is removed when the interactor is dropped.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{Cred, FetchOptions, PushOptions, RemoteCallbacks, Repository, Signature};
use sparrow_core::{GlobalTarget, RegistryFile};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::InteractorError;
use crate::interactor::RemoteInteractor;

/// Configuration for the git backend.
#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Remote URL to clone, e.g. `https://git.example.com/sparrow/registry.git`.
    pub remote_url: String,
    /// Branch to track; defaults to the remote's default branch.
    pub branch: Option<String>,
    /// Directory within the repository holding the registry files.
    pub path: String,
    /// HTTPS token used as the password half of basic auth. Never logged.
    pub token: Option<String>,
}

/// [`RemoteInteractor`] implementation backed by a real git checkout.
pub struct GitInteractor {
    checkout: TempDir,
    config: GitConfig,
}

impl GitInteractor {
    /// Clone the configured remote into a fresh temporary checkout.
    pub fn new(config: GitConfig) -> Result<Self, InteractorError> {
        if config.remote_url.is_empty() {
            return Err(InteractorError::InvalidConfig("git remote_url must not be empty".into()));
        }
        let checkout = TempDir::new()?;
        clone_into(&config, checkout.path())?;
        Ok(Self { checkout, config })
    }

    fn registry_dir(&self) -> PathBuf {
        self.checkout.path().join(self.config.path.trim_matches('/'))
    }
}

fn pull(checkout: &Path, config: &GitConfig) -> Result<(), InteractorError> {
    let repo = Repository::open(checkout)?;
    let branch = config.branch.clone().unwrap_or_else(|| "main".to_string());
    let mut remote = repo.find_remote("origin")?;
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks_for(config));
    remote.fetch(&[branch.as_str()], Some(&mut fetch_opts), None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let mut checkout_opts = git2::build::CheckoutBuilder::new();
    checkout_opts.force();
    repo.checkout_tree(&repo.find_object(fetch_commit.id(), None)?, Some(&mut checkout_opts))?;
    repo.set_head_detached(fetch_commit.id())?;
    Ok(())
}

fn commit_and_push(checkout: &Path, config: &GitConfig, file: &RegistryFile, op: FileOp) -> Result<(), InteractorError> {
    pull(checkout, config)?;
    let repo = Repository::open(checkout)?;
    let dir = checkout.join(config.path.trim_matches('/'));
    fs::create_dir_all(&dir)?;
    let target_path = dir.join(file.file_name());

    match op {
        FileOp::Create | FileOp::Update => {
            let body = serde_json::to_vec_pretty(&file.content)?;
            fs::write(&target_path, body)?;
        }
        FileOp::Delete => {
            if target_path.exists() {
                fs::remove_file(&target_path)?;
            }
        }
    }

    let relative = target_path
        .strip_prefix(checkout)
        .expect("target_path is always under the checkout root");
    let mut index = repo.index()?;
    match op {
        FileOp::Create | FileOp::Update => index.add_path(relative)?,
        FileOp::Delete => index.remove_path(relative)?,
    }
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now(&file.author_name, &file.author_email)?;
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, &file.commit_message, &tree, &parents)?;

    let branch = config.branch.clone().unwrap_or_else(|| "main".to_string());
    let mut remote = repo.find_remote("origin")?;
    let mut push_opts = PushOptions::new();
    push_opts.remote_callbacks(callbacks_for(config));
    let refspec = format!("HEAD:refs/heads/{branch}");
    remote.push(&[refspec.as_str()], Some(&mut push_opts))?;
    Ok(())
}

fn callbacks_for(config: &GitConfig) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(token) = config.token.clone() {
        callbacks.credentials(move |_url, _username, _allowed| Cred::userpass_plaintext("oauth2", &token));
    }
    callbacks
}

enum FileOp {
    Create,
    Update,
    Delete,
}

fn clone_into(config: &GitConfig, dest: &Path) -> Result<Repository, InteractorError> {
    let mut fetch_opts = FetchOptions::new();
    let mut callbacks = RemoteCallbacks::new();
    if let Some(token) = config.token.clone() {
        callbacks.credentials(move |_url, _username, _allowed| Cred::userpass_plaintext("oauth2", &token));
    }
    fetch_opts.remote_callbacks(callbacks);
    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_opts);
    if let Some(branch) = &config.branch {
        builder.branch(branch);
    }
    Ok(builder.clone(&config.remote_url, dest)?)
}

/// Blocking `git2`/filesystem work is dispatched onto the blocking pool so
/// it never stalls the async runtime.
async fn blocking<F, T>(f: F) -> Result<T, InteractorError>
where
    F: FnOnce() -> Result<T, InteractorError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| InteractorError::InvalidConfig(format!("git task panicked: {e}")))?
}

#[async_trait]
impl RemoteInteractor for GitInteractor {
    #[instrument(skip(self, cancel))]
    async fn fetch_files(&self, cancel: &CancellationToken) -> Result<Vec<GlobalTarget>, InteractorError> {
        if cancel.is_cancelled() {
            return Err(InteractorError::InvalidConfig("cancelled".into()));
        }
        let dir = self.registry_dir();
        blocking(move || {
            let mut out = Vec::new();
            if !dir.exists() {
                return Ok(out);
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let body = fs::read(&path)?;
                out.push(serde_json::from_slice::<GlobalTarget>(&body)?);
            }
            Ok(out)
        })
        .await
    }

    #[instrument(skip(self, cancel, file), fields(name = %file.name))]
    async fn post_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError> {
        if cancel.is_cancelled() {
            return Err(InteractorError::InvalidConfig("cancelled".into()));
        }
        if self.registry_dir().join(file.file_name()).exists() {
            return Err(InteractorError::InvalidConfig(format!("{} already exists", file.file_name())));
        }
        let (checkout, config, file) = (self.checkout.path().to_path_buf(), self.config.clone(), file.clone());
        blocking(move || commit_and_push(&checkout, &config, &file, FileOp::Create)).await
    }

    #[instrument(skip(self, cancel, file), fields(name = %file.name))]
    async fn put_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError> {
        if cancel.is_cancelled() {
            return Err(InteractorError::InvalidConfig("cancelled".into()));
        }
        let (checkout, config, file) = (self.checkout.path().to_path_buf(), self.config.clone(), file.clone());
        blocking(move || commit_and_push(&checkout, &config, &file, FileOp::Update)).await
    }

    #[instrument(skip(self, cancel, file), fields(name = %file.name))]
    async fn delete_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError> {
        if file.name.is_empty() {
            return Err(InteractorError::InvalidConfig("delete_file requires a non-empty name".into()));
        }
        if cancel.is_cancelled() {
            return Err(InteractorError::InvalidConfig("cancelled".into()));
        }
        let (checkout, config, file) = (self.checkout.path().to_path_buf(), self.config.clone(), file.clone());
        blocking(move || commit_and_push(&checkout, &config, &file, FileOp::Delete)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_remote_url() {
        let config = GitConfig {
            remote_url: String::new(),
            branch: None,
            path: "registry".into(),
            token: None,
        };
        assert!(GitInteractor::new(config).is_err());
    }
}
