//! Exponential-backoff retry loop shared by every HTTP-speaking backend
//! and, via `sparrow-runtime`, by the check tick itself.

use std::future::Future;

use sparrow_core::RetryConfig;
use tokio_util::sync::CancellationToken;

/// Run `op` until it succeeds, it runs out of retries, or `cancel` fires.
///
/// With `retry.count == 0` this calls `op` exactly once. Otherwise it
/// retries up to `retry.count` additional times, sleeping
/// `retry.delay_for_attempt(n)` between attempt `n` and `n + 1`. The sleep
/// is cancellation-aware: if `cancel` fires while waiting, the last error is
/// returned immediately rather than waiting out the remaining delay.
pub async fn retry_with_backoff<F, Fut, T, E>(
    retry: &RetryConfig,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= retry.count {
                    return Err(err);
                }
                attempt += 1;
                let delay = retry.delay_for_attempt(attempt);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_ok() {
        let calls = AtomicU32::new(0);
        let retry = RetryConfig {
            count: 3,
            initial_delay: Duration::from_millis(1),
        };
        let cancel = CancellationToken::new();
        let result: Result<u32, &str> = retry_with_backoff(&retry, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_count_then_gives_up() {
        let calls = AtomicU32::new(0);
        let retry = RetryConfig {
            count: 2,
            initial_delay: Duration::from_millis(1),
        };
        let cancel = CancellationToken::new();
        let result: Result<u32, &str> = retry_with_backoff(&retry, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("boom") }
        })
        .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_wait() {
        let retry = RetryConfig {
            count: 5,
            initial_delay: Duration::from_secs(60),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<u32, &str> = retry_with_backoff(&retry, &cancel, || async { Err("boom") }).await;
        assert_eq!(result, Err("boom"));
    }
}
