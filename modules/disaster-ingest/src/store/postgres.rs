use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use disaster_common::{HistoricalDisasterEvent, LiveDisasterEvent};
use disaster_store::PgDisasterStore;

use crate::traits::DisasterStore;

#[async_trait]
impl DisasterStore for PgDisasterStore {
    async fn insert_live_event(&self, event: &LiveDisasterEvent) -> Result<i64> {
        self.insert_live(event).await
    }

    async fn update_live_event(&self, event: &LiveDisasterEvent) -> Result<()> {
        self.update_live(event).await
    }

    async fn list_live_events(&self) -> Result<Vec<LiveDisasterEvent>> {
        self.list_live().await
    }

    async fn find_similar_live_event(
        &self,
        candidate: &LiveDisasterEvent,
    ) -> Result<Option<LiveDisasterEvent>> {
        self.find_similar_live(candidate.disaster_type, &candidate.location)
            .await
    }

    async fn deactivate_stale_live_events(
        &self,
        touched: &HashSet<i64>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let ids: Vec<i64> = touched.iter().copied().collect();
        self.deactivate_stale(&ids, now).await
    }

    async fn insert_history_event(&self, event: &HistoricalDisasterEvent) -> Result<i64> {
        self.insert_history(event).await
    }

    async fn is_duplicate_history_event(
        &self,
        candidate: &HistoricalDisasterEvent,
    ) -> Result<bool> {
        self.is_duplicate_history(candidate).await
    }

    async fn list_history(&self, limit: usize) -> Result<Vec<HistoricalDisasterEvent>> {
        PgDisasterStore::list_history(self, limit).await
    }
}
