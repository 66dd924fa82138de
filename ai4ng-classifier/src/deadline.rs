//! Per-call deadline for backing-store calls

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `call`, failing with `on_timeout` once `limit` elapses
///
/// `on_timeout` receives a description of the elapsed call and should build
/// the backend's "unavailable" error, so callers see a retryable failure
/// rather than a partial result.
pub async fn within<F, T, E>(
    limit: Duration,
    what: &str,
    on_timeout: impl FnOnce(String) -> E,
    call: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(call = what, limit_ms = limit.as_millis() as u64, "Backing store call timed out");
            Err(on_timeout(format!(
                "{} timed out after {} ms",
                what,
                limit.as_millis()
            )))
        }
    }
}
