use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use super::bounded;
use crate::error::IngestError;
use crate::traits::DisasterStore;

/// Retire every active live event not touched during this pass.
/// Called once per snapshot, after all records have been resolved.
pub async fn sweep(
    store: &dyn DisasterStore,
    touched: &HashSet<i64>,
    now: DateTime<Utc>,
    limit: Duration,
) -> Result<u64, IngestError> {
    let retired = bounded(
        "deactivate_stale_live_events",
        limit,
        store.deactivate_stale_live_events(touched, now),
    )
    .await?;

    if retired > 0 {
        info!(retired, touched = touched.len(), "Retired live events no longer reported");
    }
    Ok(retired)
}
