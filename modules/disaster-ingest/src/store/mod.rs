pub mod memory;
mod postgres;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use disaster_common::Config;
use disaster_store::PgDisasterStore;

use crate::traits::DisasterStore;

pub use memory::MemoryDisasterStore;

/// Build the store the binary runs against: Postgres when `DATABASE_URL`
/// is set (migrations applied on connect), otherwise in-memory.
pub async fn build_store(config: &Config) -> Result<Arc<dyn DisasterStore>> {
    let rules = config.ingest.match_rules;
    match config.database_url.as_deref() {
        Some(url) => {
            let store = PgDisasterStore::connect(url, rules).await?;
            disaster_store::migrate(store.pool()).await?;
            info!("Connected to Postgres disaster store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store (nothing will persist)");
            Ok(Arc::new(MemoryDisasterStore::new(rules)))
        }
    }
}
