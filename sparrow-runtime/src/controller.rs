//! [`ChecksController`]: owns the set of running checks and their result
//! forwarding (§4.6).
//!
//! Register spawns two cooperating tasks per check — one drives `run`, the
//! other drains the check's result channel into the store — mirroring the
//! teacher's one-task-per-watched-object applier loop, generalized from a
//! single reconcile loop to a per-check pair since each check is its own
//! independently cancellable unit here.

use std::sync::Arc;

use indexmap::IndexMap;
use sparrow_core::{CheckResult, CoreError, ResultRecord};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::check::{Check, CheckState};
use crate::metrics::MetricsRegistry;
use crate::store::Writer;

/// A check's run error, tagged with the check that produced it so
/// [`ChecksController::listen_errors`] can unregister just that check.
#[derive(Debug)]
pub struct ControllerError {
    /// Name of the check whose `run` returned an error.
    pub check_name: String,
    /// The error itself.
    pub error: CoreError,
}

struct RegisteredCheck {
    check: Arc<dyn Check>,
    #[allow(dead_code)]
    state: CheckState,
    cancel: CancellationToken,
    run_handle: JoinHandle<()>,
    forward_handle: JoinHandle<()>,
}

/// Owns every currently-active check and its result-forwarding task.
pub struct ChecksController {
    checks: RwLock<IndexMap<String, RegisteredCheck>>,
    /// Serializes `register`/`unregister` against each other so the
    /// duplicate-name check and the eventual insert/remove happen
    /// atomically with respect to any other registration in flight.
    registration_lock: Mutex<()>,
    error_tx: mpsc::Sender<ControllerError>,
    error_rx: Mutex<Option<mpsc::Receiver<ControllerError>>>,
    store: Writer,
    metrics: MetricsRegistry,
    cancel: CancellationToken,
}

impl ChecksController {
    /// Build a new, empty controller over `store` and `metrics`.
    pub fn new(store: Writer, metrics: MetricsRegistry) -> Self {
        let (error_tx, error_rx) = mpsc::channel(1);
        Self {
            checks: RwLock::new(IndexMap::new()),
            registration_lock: Mutex::new(()),
            error_tx,
            error_rx: Mutex::new(Some(error_rx)),
            store,
            metrics,
            cancel: CancellationToken::new(),
        }
    }

    /// A read-only handle onto the result store this controller forwards
    /// into.
    pub fn store_reader(&self) -> crate::store::Store {
        self.store.as_reader()
    }

    /// Register `check`: register its metric collectors, hand it its
    /// result sink, and spawn its `run` + forwarder tasks.
    ///
    /// Fails if a check with the same name is already registered.
    pub async fn register(&self, check: Arc<dyn Check>) -> Result<(), CoreError> {
        let _guard = self.registration_lock.lock().await;
        let name = check.name().to_string();
        if self.checks.read().await.contains_key(&name) {
            return Err(CoreError::InvalidConfig {
                field: "name".into(),
                reason: format!("check `{name}` is already registered"),
            });
        }

        self.metrics.register_all(check.metric_collectors());

        let (tx, mut rx) = mpsc::channel::<CheckResult>(1);
        check.startup(tx).await?;

        let child_cancel = self.cancel.child_token();

        let run_check = check.clone();
        let run_cancel = child_cancel.clone();
        let error_tx = self.error_tx.clone();
        let run_name = name.clone();
        let run_handle = tokio::spawn(async move {
            if let Err(error) = run_check.run(run_cancel).await {
                let _ = error_tx.send(ControllerError { check_name: run_name, error }).await;
            }
        });

        let store = self.store.clone();
        let forward_name = name.clone();
        let forward_handle = tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                store.save(ResultRecord {
                    name: forward_name.clone(),
                    result,
                });
            }
        });

        self.checks.write().await.insert(
            name,
            RegisteredCheck {
                check,
                state: CheckState::Running,
                cancel: child_cancel,
                run_handle,
                forward_handle,
            },
        );
        Ok(())
    }

    /// Unregister a check by name. Missing names are not an error.
    pub async fn unregister(&self, name: &str) {
        let _guard = self.registration_lock.lock().await;
        let entry = self.checks.write().await.shift_remove(name);
        let Some(entry) = entry else { return };

        entry.cancel.cancel();
        if let Err(err) = entry.check.shutdown(entry.cancel.clone()).await {
            warn!(check = name, error = %err, "error during check shutdown");
        }
        let _ = entry.run_handle.await;
        let _ = entry.forward_handle.await;
        self.metrics.unregister_all(entry.check.metric_collectors());
    }

    /// Whether a check with `name` is currently registered.
    pub async fn contains(&self, name: &str) -> bool {
        self.checks.read().await.contains_key(name)
    }

    /// Apply a config update to an already-registered check in place.
    /// Returns `None` if no check is registered under `name`.
    pub async fn set_config(
        &self,
        name: &str,
        update: crate::check::CheckConfigUpdate,
    ) -> Option<Result<(), CoreError>> {
        self.checks
            .read()
            .await
            .get(name)
            .map(|entry| entry.check.set_config(update))
    }

    /// Every currently registered check's name, in registration order.
    pub async fn names(&self) -> Vec<String> {
        self.checks.read().await.keys().cloned().collect()
    }

    /// Consumes run errors until `cancel` fires; a check whose `run`
    /// returned an error is unregistered (one misbehaving check cannot
    /// take the process down) and the error is always logged.
    ///
    /// Only the first caller receives errors: the channel's receiving end
    /// is taken once.
    pub async fn listen_errors(&self, cancel: CancellationToken) {
        let Some(mut rx) = self.error_rx.lock().await.take() else {
            return;
        };
        loop {
            tokio::select! {
                maybe_err = rx.recv() => {
                    match maybe_err {
                        Some(err) => {
                            error!(check = %err.check_name, error = %err.error, "check run failed; unregistering");
                            self.unregister(&err.check_name).await;
                        }
                        None => return,
                    }
                }
                _ = cancel.cancelled() => return,
            }
        }
    }

    /// Unregister every check, then stop accepting new work.
    pub async fn shutdown(&self) {
        let names = self.names().await;
        for name in names {
            self.unregister(&name).await;
        }
        self.cancel.cancel();
    }

    /// The boilerplate OpenAPI document with one `/v1/metrics/{name}` path
    /// per currently registered check.
    pub async fn generate_openapi(&self) -> serde_json::Value {
        let mut doc = boilerplate_openapi_document();
        let checks = self.checks.read().await;
        let paths = doc
            .get_mut("paths")
            .and_then(|p| p.as_object_mut())
            .expect("boilerplate document always declares a paths object");
        for entry in checks.values() {
            let (path, item) = entry.check.schema().openapi_path();
            paths.insert(path, item);
        }
        doc
    }
}


fn boilerplate_openapi_document() -> serde_json::Value {
    serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Sparrow",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {},
    })
}
