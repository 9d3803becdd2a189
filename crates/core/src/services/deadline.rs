//! Deadlines for storage calls.

use std::future::Future;
use std::time::Duration;

use guildpolls_common::{AppError, AppResult};

/// Run a storage call, failing with [`AppError::Timeout`] once `limit` elapses.
///
/// Dropping the returned future drops the storage call with it.
pub async fn bounded<T, F>(limit: Duration, what: &'static str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        tracing::warn!(query = what, timeout_ms = limit.as_millis(), "Storage call timed out");
        AppError::Timeout(format!("{what} exceeded {}ms", limit.as_millis()))
    })?
}
