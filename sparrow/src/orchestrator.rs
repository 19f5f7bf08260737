//! Ties the loader, target manager, checks controller and HTTP API
//! together and owns shutdown (§4.7, §5).
//!
//! The `select!` between a shutdown signal and the fatal-error channel
//! mirrors the teacher's `Elector::run` (`kube-runtime/src/lease/mod.rs`):
//! race the long-running work against whatever ends it first.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use sparrow_checks::CheckRegistry;
use sparrow_client::{GitConfig, GitInteractor, GitlabConfig, GitlabInteractor, RemoteInteractor};
use sparrow_core::{RetryConfig, RuntimeConfig};
use sparrow_runtime::loader::file::FileLoader;
use sparrow_runtime::loader::http::{HttpLoader, HttpLoaderConfig};
use sparrow_runtime::{ChecksController, Loader, MetricsRegistry, Reconciler, TargetManager, TargetManagerConfig, Writer};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{LoaderKind, LoaderSettings, SparrowConfig, TargetManagerKind, TargetManagerSettings};
use crate::error::ShutdownErrors;

/// Run every managed component until a shutdown signal or a fatal error,
/// then shut everything down within the bounded deadline.
pub async fn run(config: SparrowConfig) -> Result<(), ShutdownErrors> {
    let mut errors = ShutdownErrors::default();
    let root_cancel = CancellationToken::new();

    let metrics = MetricsRegistry::new();
    let writer = Writer::default();
    let controller = Arc::new(ChecksController::new(writer, metrics.clone()));

    let interactor = match build_interactor(&config.target_manager) {
        Ok(interactor) => interactor,
        Err(message) => {
            errors.push("target_manager", message);
            return Err(errors);
        }
    };

    let own_url = format!("{}://{}", config.target_manager.scheme, config.sparrow_name);
    let unhealthy_threshold =
        chrono::Duration::from_std(config.target_manager.unhealthy_threshold).unwrap_or_else(|_| chrono::Duration::zero());
    let target_manager = Arc::new(TargetManager::new(
        TargetManagerConfig {
            self_name: config.sparrow_name.clone(),
            scheme: config.target_manager.scheme.clone(),
            check_interval: config.target_manager.check_interval,
            registration_interval: config.target_manager.registration_interval,
            update_interval: config.target_manager.update_interval,
            unhealthy_threshold,
            author_name: "sparrow".to_string(),
            author_email: format!("{}@sparrow.local", config.sparrow_name),
        },
        interactor,
    ));

    let loader = match build_loader(&config.loader) {
        Ok(loader) => loader,
        Err(message) => {
            errors.push("loader", message);
            return Err(errors);
        }
    };

    let addr: SocketAddr = match config.api_address.parse() {
        Ok(addr) => addr,
        Err(err) => {
            errors.push("api", format!("invalid apiAddress `{}`: {err}", config.api_address));
            return Err(errors);
        }
    };

    let reconciler = Arc::new(Reconciler::new(controller.clone(), CheckRegistry, own_url));

    let api_state = Arc::new(sparrow_api::ApiState {
        controller: controller.clone(),
        store: controller.store_reader(),
        metrics: metrics.clone(),
        dispatch: Arc::new(sparrow_api::DispatchTable::new()),
        healthy: Arc::new(AtomicBool::new(true)),
    });
    let app = sparrow_api::router(api_state);

    let (config_tx, mut config_rx) = mpsc::channel::<RuntimeConfig>(1);
    let (fatal_tx, mut fatal_rx) = mpsc::channel::<(&'static str, String)>(1);

    let tm_handle = {
        let target_manager = target_manager.clone();
        let cancel = root_cancel.child_token();
        tokio::spawn(async move { target_manager.reconcile(cancel).await })
    };

    let loader_handle = {
        let cancel = root_cancel.child_token();
        let fatal_tx = fatal_tx.clone();
        tokio::spawn(async move {
            loader.run(cancel.clone(), config_tx).await;
            if !cancel.is_cancelled() {
                let _ = fatal_tx.send(("loader", "loader exited before shutdown was requested".to_string())).await;
            }
        })
    };

    let errors_handle = {
        let controller = controller.clone();
        let cancel = root_cancel.child_token();
        tokio::spawn(async move { controller.listen_errors(cancel).await })
    };

    let api_cancel = root_cancel.child_token();
    let api_handle = {
        let fatal_tx = fatal_tx.clone();
        tokio::spawn(async move {
            if let Err(message) = sparrow_api::serve(addr, app, api_cancel, Duration::from_secs(5)).await {
                let _ = fatal_tx.send(("api", message)).await;
            }
        })
    };

    let reconcile_handle = {
        let reconciler = reconciler.clone();
        let target_manager = target_manager.clone();
        let cancel = root_cancel.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_config = config_rx.recv() => {
                        match maybe_config {
                            Some(config) => {
                                let peers = target_manager.get_targets().await;
                                reconciler.reconcile(config, &peers).await;
                            }
                            None => return,
                        }
                    }
                    _ = cancel.cancelled() => return,
                }
            }
        })
    };

    tokio::select! {
        _ = shutdown_signal() => {
            info!("received shutdown signal");
        }
        Some((component, message)) = fatal_rx.recv() => {
            error!(component, %message, "fatal component error; shutting down");
            errors.push(component, message);
        }
    }

    root_cancel.cancel();

    let drained = tokio::time::timeout(Duration::from_secs(90), async {
        let _ = reconcile_handle.await;
        let _ = tm_handle.await;
        let _ = errors_handle.await;
        let _ = loader_handle.await;
        controller.shutdown().await;
        let delete_cancel = CancellationToken::new();
        if let Err(message) = target_manager.shutdown(&delete_cancel, Duration::from_secs(30)).await {
            error!(error = %message, "failed to delete registry entry on shutdown");
        }
        let _ = api_handle.await;
    })
    .await;

    if drained.is_err() {
        errors.push("orchestrator", "shutdown did not complete within the bounded deadline");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn build_interactor(settings: &TargetManagerSettings) -> Result<Arc<dyn RemoteInteractor>, String> {
    match settings.kind {
        TargetManagerKind::Git => {
            let git = settings.git.clone().ok_or("targetManager.git is required when type is git")?;
            let interactor = GitInteractor::new(GitConfig {
                remote_url: git.remote_url,
                branch: git.branch,
                path: git.path,
                token: git.token,
            })
            .map_err(|e| e.to_string())?;
            Ok(Arc::new(interactor))
        }
        TargetManagerKind::Gitlab => {
            let gitlab = settings.gitlab.clone().ok_or("targetManager.gitlab is required when type is gitlab")?;
            let interactor = GitlabInteractor::new(GitlabConfig {
                base_url: gitlab.base_url,
                project_id: gitlab.project_id,
                token: gitlab.token,
                branch: gitlab.branch,
                path: gitlab.path,
            })
            .map_err(|e| e.to_string())?;
            Ok(Arc::new(interactor))
        }
    }
}

fn build_loader(settings: &LoaderSettings) -> Result<Box<dyn Loader>, String> {
    match settings.kind {
        LoaderKind::Http => {
            let http = settings.http.clone().ok_or("loader.http is required when type is http")?;
            let loader = HttpLoader::new(HttpLoaderConfig {
                url: http.url,
                interval: settings.interval,
                request_timeout: http.timeout,
                bearer_token: http.token,
                retry: RetryConfig::default(),
            })?;
            Ok(Box::new(loader))
        }
        LoaderKind::File => {
            let file = settings.file.clone().ok_or("loader.file is required when type is file")?;
            Ok(Box::new(FileLoader::new(file.path, settings.interval)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("installing SIGTERM handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
