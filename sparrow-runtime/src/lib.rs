//! The checks controller runtime: result store, check contract, retry
//! wrapper, config loaders, runtime-config reconciler, target manager and
//! metrics registry.

pub mod backoff;
pub mod check;
pub mod controller;
pub mod loader;
pub mod metrics;
pub mod reconciler;
pub mod store;
pub mod target_manager;

pub use check::{Check, CheckConfigUpdate, CheckState};
pub use controller::{ChecksController, ControllerError};
pub use loader::Loader;
pub use metrics::MetricsRegistry;
pub use reconciler::{CheckFactory, Reconciler};
pub use store::{Store, Writer};
pub use target_manager::{TargetManager, TargetManagerConfig};
