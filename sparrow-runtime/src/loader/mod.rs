//! [`Loader`]: produces a stream of [`RuntimeConfig`] updates onto a channel
//! (§4.3).

pub mod file;
pub mod http;

pub use file::FileLoader;
pub use http::HttpLoader;

use async_trait::async_trait;
use sparrow_core::RuntimeConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Produces [`RuntimeConfig`] updates by polling a source on an interval.
///
/// Decode failures are logged and do not stop the loop; only channel
/// closure (the reconciler has gone away) or cancellation ends it.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Poll the source until `cancel` fires or the receiving end of `tx`
    /// is dropped.
    async fn run(&self, cancel: CancellationToken, tx: mpsc::Sender<RuntimeConfig>);
}
