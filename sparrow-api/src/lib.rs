//! The HTTP surface: OpenAPI document, per-check results, Prometheus
//! exposition and the runtime-registrable checks dispatch table (§4.8).

pub mod dispatch;
pub mod openapi;
pub mod routes;

pub use dispatch::{CheckRoute, DispatchTable};
pub use routes::{router, serve, ApiState};
