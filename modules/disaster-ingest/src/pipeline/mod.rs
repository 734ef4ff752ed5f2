pub mod classifier;
pub mod dedup;
pub mod normalizer;
pub mod orchestrator;
pub mod stats;
pub mod sweeper;

use std::future::Future;
use std::time::Duration;

use crate::error::IngestError;

pub use orchestrator::{IngestPhase, Ingestor};
pub use stats::{FailureReason, IngestionReport};

/// Run one store call under `limit`. Store errors and timeouts both map to
/// `StoreUnavailable`.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, IngestError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(IngestError::store(operation, e)),
        Err(_) => Err(IngestError::timed_out(operation, limit)),
    }
}
