//! Timeouts at the boundary of every external call.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;

/// Run CPU-bound model work off the async threads, bounded by `limit`.
/// On timeout the worker is left to finish; its result is discarded.
pub(crate) async fn blocking<T, F>(limit: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
        Err(_) => Err(anyhow!("timed out after {:?}", limit)),
        Ok(Err(join)) => Err(anyhow!("worker failed: {}", join)),
        Ok(Ok(result)) => result,
    }
}

pub(crate) async fn io<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow!("timed out after {:?}", limit))?
}
