use std::future::Future;
use std::time::Duration;

use crate::error::Classify;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation} exceeded its {limit:?} deadline")]
pub struct DeadlineExceeded {
    pub operation: &'static str,
    pub limit: Duration,
}

/// Runs `fut` under `limit`.
///
/// On expiry the future is dropped together with any transaction it holds,
/// which rolls that transaction back. Every public operation funnels through
/// here, so internal failures are logged once on the way out.
pub async fn with_deadline<T, E, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded> + Classify,
{
    let result = match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?limit, "deadline exceeded, work rolled back");
            Err(DeadlineExceeded { operation, limit }.into())
        }
    };

    if let Err(e) = &result {
        let _span = tracing::error_span!("op", operation).entered();
        e.log_if_internal();
    }
    result
}
