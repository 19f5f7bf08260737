//! The axum `Router` (§4.8), grounded on the teacher's own
//! `examples/admission_controller.rs` webhook server: axum + a
//! `tower_http::trace::TraceLayer` logging wrapper, plus a bounded
//! `TimeoutLayer` for every handler.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use sparrow_runtime::{ChecksController, MetricsRegistry, Store};
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{error, info, Level};

use crate::dispatch::{self, DispatchTable};
use crate::openapi;

/// Shared state every handler reads.
pub struct ApiState {
    pub controller: Arc<ChecksController>,
    pub store: Store,
    pub metrics: MetricsRegistry,
    pub dispatch: Arc<DispatchTable>,
    pub healthy: Arc<AtomicBool>,
}

/// Build the full router over `state`.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/openapi", get(get_openapi))
        .route("/v1/metrics/{name}", get(get_check_result))
        .route("/metrics", get(get_metrics))
        .route("/healthz", get(get_healthz))
        .route("/checks/{*rest}", any(checks_dispatch))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .layer(TimeoutLayer::new(Duration::from_secs(5)))
        .with_state(state)
}

/// Serve `router` on `addr` until `cancel` fires, then stop within
/// `shutdown_timeout`.
pub async fn serve(addr: SocketAddr, router: Router, cancel: CancellationToken, shutdown_timeout: Duration) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| format!("binding {addr}: {e}"))?;
    info!(%addr, "http api listening");

    let shutdown_signal = cancel.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal.cancelled().await;
    });
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result.map_err(|e| format!("http server error: {e}")),
        _ = cancel.cancelled() => match tokio::time::timeout(shutdown_timeout, server).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("http server error: {err}")),
            Err(_) => {
                error!(?shutdown_timeout, "http server did not drain in time");
                Err(format!("http server did not shut down within {shutdown_timeout:?}"))
            }
        },
    }
}

async fn get_openapi(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    let doc = state.controller.generate_openapi().await;
    openapi::render(&doc, &headers)
}

async fn get_check_result(State(state): State<Arc<ApiState>>, Path(name): Path<String>) -> Response {
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "check name must not be empty").into_response();
    }
    match state.store.get(&name) {
        Some(result) => axum::Json(sparrow_core::ResultRecord { name, result }).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no result recorded for check `{name}`")).into_response(),
    }
}

async fn get_metrics(State(state): State<Arc<ApiState>>) -> Response {
    match state.metrics.gather_text() {
        Ok(text) => ([("content-type", "text/plain; version=0.0.4")], text).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}

async fn get_healthz(State(state): State<Arc<ApiState>>) -> Response {
    if state.healthy.load(Ordering::SeqCst) {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn checks_dispatch(State(state): State<Arc<ApiState>>, request: axum::http::Request<axum::body::Body>) -> Response {
    match state.dispatch.dispatch(request).await {
        Some(response) => response,
        None => dispatch::not_found(),
    }
}
