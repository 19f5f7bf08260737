//! Per-target tick helper: overall timeout plus the shared exponential
//! backoff retry policy (§4.1).

use std::future::Future;
use std::time::Duration;

use sparrow_client::retry_with_backoff;
use sparrow_core::RetryConfig;
use tokio_util::sync::CancellationToken;

/// Run a single target's probe attempt under `timeout`, retrying per
/// `retry` on failure (including a timed-out attempt, which is reported as
/// a timeout error to the retry loop).
///
/// Checks call this once per target and fold the per-target outcomes into
/// one [`sparrow_core::CheckResult`] (§4.1: "per-target failures ... do not
/// abort sibling targets").
pub async fn probe_with_retry<F, Fut, T>(
    timeout: Duration,
    retry: &RetryConfig,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    retry_with_backoff(retry, cancel, || async {
        match tokio::time::timeout(timeout, probe()).await {
            Ok(result) => result,
            Err(_) => Err(format!("timed out after {timeout:?}")),
        }
    })
    .await
}
