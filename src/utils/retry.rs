//! Bounded retry for transient network failures.

use crate::config::RetryConfig;
use crate::core::IngestError;
use std::future::Future;
use tokio_retry::RetryIf;
use tracing::warn;

/// Runs `action` until it succeeds, fails with a non-transient error, or the
/// attempts in `retry` are used up.
///
/// Only errors for which [`IngestError::is_transient`] holds are retried, so a
/// 404 or a malformed index fails on the first attempt.
pub async fn retry_transient<T, F, Fut>(
    retry: &RetryConfig,
    what: &str,
    action: F,
) -> Result<T, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IngestError>>,
{
    RetryIf::spawn(retry.strategy(), action, |error: &IngestError| {
        let transient = error.is_transient();
        if transient {
            warn!("Retrying {what} after transient failure: {error}");
        }
        transient
    })
    .await
}
