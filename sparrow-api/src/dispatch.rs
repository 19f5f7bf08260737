//! The mutable, lock-protected `(method, path) -> handler` table that
//! checks register under `/checks/*` at runtime (§4.8).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use tokio::sync::RwLock;

/// A check-owned handler for one `/checks/*` route.
#[async_trait]
pub trait CheckRoute: Send + Sync {
    /// Handle one matched request.
    async fn handle(&self, request: Request<Body>) -> Response;
}

/// Checks register and deregister entries here; the API layer only reads it.
#[derive(Default)]
pub struct DispatchTable {
    routes: RwLock<HashMap<(Method, String), Arc<dyn CheckRoute>>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `(method, path)`, replacing any prior one.
    pub async fn register(&self, method: Method, path: impl Into<String>, handler: Arc<dyn CheckRoute>) {
        self.routes.write().await.insert((method, path.into()), handler);
    }

    /// Remove the handler for `(method, path)`, if any.
    pub async fn deregister(&self, method: &Method, path: &str) {
        self.routes.write().await.remove(&(method.clone(), path.to_string()));
    }

    /// Dispatch `request`, returning `None` (caller renders 404) if no
    /// handler is registered for its method and path.
    pub async fn dispatch(&self, request: Request<Body>) -> Option<Response> {
        let key = (request.method().clone(), request.uri().path().to_string());
        let handler = self.routes.read().await.get(&key).cloned()?;
        Some(handler.handle(request).await)
    }
}

/// 404 rendered when [`DispatchTable::dispatch`] finds nothing.
pub fn not_found() -> Response {
    (axum::http::StatusCode::NOT_FOUND, "no check route registered for this path").into_response()
}
