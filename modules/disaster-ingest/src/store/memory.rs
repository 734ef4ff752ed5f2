//! In-process DisasterStore. Backs the CLI when no database is configured
//! and every pipeline test.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use disaster_common::matching::cluster_key;
use disaster_common::{HistoricalDisasterEvent, LiveDisasterEvent, MatchRules};

use crate::traits::DisasterStore;

#[derive(Default)]
struct Inner {
    live: BTreeMap<i64, LiveDisasterEvent>,
    history: Vec<HistoricalDisasterEvent>,
    next_live_id: i64,
    next_history_id: i64,
}

pub struct MemoryDisasterStore {
    inner: Mutex<Inner>,
    rules: MatchRules,
}

impl MemoryDisasterStore {
    pub fn new(rules: MatchRules) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            rules,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every live event including retired ones, in id order.
    pub fn all_live_events(&self) -> Vec<LiveDisasterEvent> {
        self.lock().live.values().cloned().collect()
    }

    pub fn live_event(&self, id: i64) -> Option<LiveDisasterEvent> {
        self.lock().live.get(&id).cloned()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }
}

impl Default for MemoryDisasterStore {
    fn default() -> Self {
        Self::new(MatchRules::default())
    }
}

#[async_trait]
impl DisasterStore for MemoryDisasterStore {
    async fn insert_live_event(&self, event: &LiveDisasterEvent) -> Result<i64> {
        let mut inner = self.lock();
        inner.next_live_id += 1;
        let id = inner.next_live_id;
        let mut stored = event.clone();
        stored.id = Some(id);
        inner.live.insert(id, stored);
        Ok(id)
    }

    async fn update_live_event(&self, event: &LiveDisasterEvent) -> Result<()> {
        let id = event
            .id
            .ok_or_else(|| anyhow!("cannot update a live event without an id"))?;
        let mut inner = self.lock();
        let slot = inner
            .live
            .get_mut(&id)
            .ok_or_else(|| anyhow!("live event {id} not found"))?;
        let created_at = slot.created_at;
        *slot = event.clone();
        slot.created_at = created_at;
        Ok(())
    }

    async fn list_live_events(&self) -> Result<Vec<LiveDisasterEvent>> {
        let mut active: Vec<LiveDisasterEvent> = self
            .lock()
            .live
            .values()
            .filter(|e| e.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(active)
    }

    async fn find_similar_live_event(
        &self,
        candidate: &LiveDisasterEvent,
    ) -> Result<Option<LiveDisasterEvent>> {
        let key = cluster_key(candidate.disaster_type, &candidate.location);
        let inner = self.lock();
        Ok(inner
            .live
            .values()
            .filter(|e| e.is_active && cluster_key(e.disaster_type, &e.location) == key)
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn deactivate_stale_live_events(
        &self,
        touched: &HashSet<i64>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut inner = self.lock();
        let mut retired = 0;
        for (id, event) in inner.live.iter_mut() {
            if event.is_active && !touched.contains(id) {
                event.is_active = false;
                event.updated_at = now;
                retired += 1;
            }
        }
        Ok(retired)
    }

    async fn insert_history_event(&self, event: &HistoricalDisasterEvent) -> Result<i64> {
        let mut inner = self.lock();
        inner.next_history_id += 1;
        let id = inner.next_history_id;
        let mut stored = event.clone();
        stored.id = Some(id);
        inner.history.push(stored);
        Ok(id)
    }

    async fn is_duplicate_history_event(
        &self,
        candidate: &HistoricalDisasterEvent,
    ) -> Result<bool> {
        let inner = self.lock();
        Ok(inner
            .history
            .iter()
            .any(|h| self.rules.history_matches(h, candidate)))
    }

    async fn list_history(&self, limit: usize) -> Result<Vec<HistoricalDisasterEvent>> {
        let mut rows = self.lock().history.clone();
        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}
