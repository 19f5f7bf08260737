//! [`TargetManager`]: keeps a fresh local view of the peer list and keeps
//! the instance's own registry entry alive (§4.5).
//!
//! The `unregistered -> registered` transition mirrors the teacher's lease
//! `Elector` state machine, simplified to two states since Sparrow has no
//! "held by another" concept: a peer registering itself cannot block this
//! instance from registering its own, differently-named, file.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sparrow_client::RemoteInteractor;
use sparrow_core::{GlobalTarget, RegistryFile};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Tunables for [`TargetManager::reconcile`]; any duration of zero disables
/// that timer.
#[derive(Debug, Clone)]
pub struct TargetManagerConfig {
    /// This instance's name; also the registry file stem.
    pub self_name: String,
    /// URL scheme used to build this instance's own URL.
    pub scheme: String,
    /// How often to refresh the peer list.
    pub check_interval: Duration,
    /// How often to attempt initial self-registration.
    pub registration_interval: Duration,
    /// How often to refresh (touch) the self entry once registered.
    pub update_interval: Duration,
    /// Peer entries older than this are dropped from the exposed list.
    /// Zero disables staleness filtering.
    pub unhealthy_threshold: chrono::Duration,
    /// Commit author name used for registry writes.
    pub author_name: String,
    /// Commit author email used for registry writes.
    pub author_email: String,
}

impl TargetManagerConfig {
    /// This instance's own advertised URL, `{scheme}://{self_name}`.
    pub fn own_url(&self) -> String {
        format!("{}://{}", self.scheme, self.self_name)
    }
}

/// Reconciles self-registration and the peer list against a
/// [`RemoteInteractor`] backend.
pub struct TargetManager {
    config: TargetManagerConfig,
    interactor: Arc<dyn RemoteInteractor>,
    peers: RwLock<Vec<GlobalTarget>>,
    registered: RwLock<bool>,
}

impl TargetManager {
    /// Build a new target manager, initially unregistered with an empty
    /// peer list.
    pub fn new(config: TargetManagerConfig, interactor: Arc<dyn RemoteInteractor>) -> Self {
        Self {
            config,
            interactor,
            peers: RwLock::new(Vec::new()),
            registered: RwLock::new(false),
        }
    }

    /// A snapshot of the current peer list, staleness-filtered.
    pub async fn get_targets(&self) -> Vec<GlobalTarget> {
        self.peers.read().await.clone()
    }

    /// Whether this instance currently believes it is registered.
    pub async fn is_registered(&self) -> bool {
        *self.registered.read().await
    }

    /// The single cooperative loop driven by the three configured timers.
    /// Runs until `cancel` fires.
    pub async fn reconcile(&self, cancel: CancellationToken) {
        let mut check_timer = positive_interval(self.config.check_interval);
        let mut registration_timer = positive_interval(self.config.registration_interval);
        let mut update_timer = positive_interval(self.config.update_interval);

        loop {
            tokio::select! {
                _ = tick(&mut check_timer) => self.check_tick(&cancel).await,
                _ = tick(&mut registration_timer) => self.registration_tick(&cancel).await,
                _ = tick(&mut update_timer) => self.update_tick(&cancel).await,
                _ = cancel.cancelled() => return,
            }
        }
    }

    async fn check_tick(&self, cancel: &CancellationToken) {
        let fetched = match self.interactor.fetch_files(cancel).await {
            Ok(targets) => targets,
            Err(err) => {
                warn!(error = %err, "failed to refresh peer list");
                return;
            }
        };

        let own_url = self.config.own_url();
        let now = Utc::now();
        let mut seen_self = false;
        let mut deduped: Vec<GlobalTarget> = Vec::with_capacity(fetched.len());
        for target in fetched {
            if self.config.unhealthy_threshold > chrono::Duration::zero()
                && target.is_stale(now, self.config.unhealthy_threshold)
            {
                continue;
            }
            if target.url == own_url {
                seen_self = true;
            }
            match deduped.iter_mut().find(|existing| existing.url == target.url) {
                Some(existing) if existing.last_seen < target.last_seen => *existing = target,
                Some(_) => {}
                None => deduped.push(target),
            }
        }

        *self.peers.write().await = deduped;
        if seen_self && !*self.registered.read().await {
            *self.registered.write().await = true;
            info!(url = %own_url, "observed own entry in remote registry; marking registered");
        }
    }

    async fn registration_tick(&self, cancel: &CancellationToken) {
        if *self.registered.read().await {
            return;
        }
        let file = self.own_registry_file("initial sparrow registration");
        match self.interactor.post_file(cancel, &file).await {
            Ok(()) => {
                *self.registered.write().await = true;
                info!(name = %self.config.self_name, "registered with remote registry");
            }
            Err(err) => warn!(error = %err, "failed to register with remote registry"),
        }
    }

    async fn update_tick(&self, cancel: &CancellationToken) {
        if !*self.registered.read().await {
            return;
        }
        let file = self.own_registry_file("update sparrow registration");
        if let Err(err) = self.interactor.put_file(cancel, &file).await {
            warn!(error = %err, "failed to refresh remote registry entry");
        }
    }

    /// Deletes the instance's own file within `timeout`, then flips to
    /// unregistered regardless of the delete outcome.
    pub async fn shutdown(&self, cancel: &CancellationToken, timeout: Duration) -> Result<(), String> {
        let was_registered = *self.registered.read().await;
        if !was_registered {
            return Ok(());
        }
        let file = self.own_registry_file("sparrow shutting down");
        let result = tokio::time::timeout(timeout, self.interactor.delete_file(cancel, &file)).await;
        *self.registered.write().await = false;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("delete_file failed: {err}")),
            Err(_) => Err(format!("delete_file timed out after {timeout:?}")),
        }
    }

    fn own_registry_file(&self, commit_message: &str) -> RegistryFile {
        RegistryFile {
            name: self.config.self_name.clone(),
            author_name: self.config.author_name.clone(),
            author_email: self.config.author_email.clone(),
            commit_message: commit_message.to_string(),
            content: GlobalTarget {
                url: self.config.own_url(),
                last_seen: Utc::now(),
            },
        }
    }
}

fn positive_interval(d: Duration) -> Option<tokio::time::Interval> {
    if d.is_zero() {
        None
    } else {
        Some(tokio::time::interval(d))
    }
}

async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sparrow_client::InteractorError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeInteractor {
        files: Mutex<Vec<GlobalTarget>>,
        posts: Mutex<u32>,
        deletes: Mutex<u32>,
    }

    #[async_trait]
    impl RemoteInteractor for FakeInteractor {
        async fn fetch_files(&self, _cancel: &CancellationToken) -> Result<Vec<GlobalTarget>, InteractorError> {
            Ok(self.files.lock().unwrap().clone())
        }
        async fn post_file(&self, _cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError> {
            *self.posts.lock().unwrap() += 1;
            self.files.lock().unwrap().push(file.content.clone());
            Ok(())
        }
        async fn put_file(&self, _cancel: &CancellationToken, _file: &RegistryFile) -> Result<(), InteractorError> {
            Ok(())
        }
        async fn delete_file(&self, _cancel: &CancellationToken, _file: &RegistryFile) -> Result<(), InteractorError> {
            *self.deletes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn config() -> TargetManagerConfig {
        TargetManagerConfig {
            self_name: "sparrow-eu-1".into(),
            scheme: "https".into(),
            check_interval: Duration::ZERO,
            registration_interval: Duration::ZERO,
            update_interval: Duration::ZERO,
            unhealthy_threshold: chrono::Duration::hours(1),
            author_name: "sparrow".into(),
            author_email: "sparrow@example.com".into(),
        }
    }

    #[tokio::test]
    async fn registration_tick_registers_when_not_yet_registered() {
        let interactor = Arc::new(FakeInteractor::default());
        let manager = TargetManager::new(config(), interactor.clone());
        let cancel = CancellationToken::new();
        assert!(!manager.is_registered().await);
        manager.registration_tick(&cancel).await;
        assert!(manager.is_registered().await);
        assert_eq!(*interactor.posts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn check_tick_filters_stale_peers_and_observes_self() {
        let interactor = Arc::new(FakeInteractor::default());
        let own_url = config().own_url();
        interactor.files.lock().unwrap().push(GlobalTarget {
            url: own_url.clone(),
            last_seen: Utc::now(),
        });
        interactor.files.lock().unwrap().push(GlobalTarget {
            url: "https://stale-peer.example".into(),
            last_seen: Utc::now() - chrono::Duration::hours(2),
        });
        let manager = TargetManager::new(config(), interactor);
        let cancel = CancellationToken::new();
        manager.check_tick(&cancel).await;

        assert!(manager.is_registered().await);
        let targets = manager.get_targets().await;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].url, own_url);
    }

    #[tokio::test]
    async fn shutdown_deletes_when_registered_and_flips_state() {
        let interactor = Arc::new(FakeInteractor::default());
        let manager = TargetManager::new(config(), interactor.clone());
        let cancel = CancellationToken::new();
        manager.registration_tick(&cancel).await;
        assert!(manager.is_registered().await);

        manager.shutdown(&cancel, Duration::from_secs(1)).await.unwrap();
        assert!(!manager.is_registered().await);
        assert_eq!(*interactor.deletes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn shutdown_is_a_noop_when_never_registered() {
        let interactor = Arc::new(FakeInteractor::default());
        let manager = TargetManager::new(config(), interactor.clone());
        let cancel = CancellationToken::new();
        manager.shutdown(&cancel, Duration::from_secs(1)).await.unwrap();
        assert_eq!(*interactor.deletes.lock().unwrap(), 0);
    }
}
