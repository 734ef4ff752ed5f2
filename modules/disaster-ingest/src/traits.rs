// Store abstraction for the ingestion pipeline.
//
// DisasterStore: every read and write the pipeline needs, behind one trait.
//   PgDisasterStore (Postgres) and MemoryDisasterStore implement it; tests wrap
//   either in FaultyStore to inject failures and latency.
//
// Matching predicates (find_similar_live_event, is_duplicate_history_event)
// must follow disaster_common::matching so every backend agrees.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use disaster_common::{HistoricalDisasterEvent, LiveDisasterEvent};

#[async_trait]
pub trait DisasterStore: Send + Sync {
    // --- Live events ---

    /// Insert a new live event. Returns the store-assigned id.
    async fn insert_live_event(&self, event: &LiveDisasterEvent) -> Result<i64>;

    /// Overwrite an existing live event, identified by `event.id`.
    async fn update_live_event(&self, event: &LiveDisasterEvent) -> Result<()>;

    /// Active live events, most recently started first.
    async fn list_live_events(&self) -> Result<Vec<LiveDisasterEvent>>;

    /// The active live event in the candidate's (type, location) cluster.
    async fn find_similar_live_event(
        &self,
        candidate: &LiveDisasterEvent,
    ) -> Result<Option<LiveDisasterEvent>>;

    /// Deactivate every active live event whose id is not in `touched`.
    /// Returns the number of events retired.
    async fn deactivate_stale_live_events(
        &self,
        touched: &HashSet<i64>,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    // --- History ---

    /// Append a historical event. Returns the store-assigned id.
    async fn insert_history_event(&self, event: &HistoricalDisasterEvent) -> Result<i64>;

    /// True when an existing row has the same type and location and an
    /// `occurred_at` inside the tolerance window.
    async fn is_duplicate_history_event(&self, candidate: &HistoricalDisasterEvent)
        -> Result<bool>;

    /// Most recent history rows by occurrence time.
    async fn list_history(&self, limit: usize) -> Result<Vec<HistoricalDisasterEvent>>;
}
