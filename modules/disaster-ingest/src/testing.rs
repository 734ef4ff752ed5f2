// Test helpers for the ingestion pipeline.
//
// - FaultyStore<S> wraps any DisasterStore and injects failures or latency
//   per operation, optionally only for one location.
// - earthquake / volcano / snapshot build feed payloads the way the crawler
//   delivers them.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use disaster_common::matching::location_key;
use disaster_common::{FeedSnapshot, HistoricalDisasterEvent, LiveDisasterEvent, RawFields};

use crate::traits::DisasterStore;

// ---------------------------------------------------------------------------
// FaultyStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    InsertLive,
    UpdateLive,
    ListLive,
    FindSimilarLive,
    DeactivateStale,
    InsertHistory,
    IsDuplicateHistory,
    ListHistory,
}

#[derive(Debug, Clone)]
enum Effect {
    Fail,
    Delay(Duration),
}

#[derive(Debug, Clone)]
struct Fault {
    op: StoreOp,
    location: Option<String>,
    effect: Effect,
}

/// Delegates to `inner` unless a registered fault matches the call.
pub struct FaultyStore<S> {
    inner: S,
    faults: Mutex<Vec<Fault>>,
}

impl<S: DisasterStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Every call to `op` errors.
    pub fn fail(self, op: StoreOp) -> Self {
        self.push(op, None, Effect::Fail)
    }

    /// Calls to `op` for events at `location` error.
    pub fn fail_for_location(self, op: StoreOp, location: &str) -> Self {
        self.push(op, Some(location_key(location)), Effect::Fail)
    }

    /// Every call to `op` sleeps for `by` before delegating.
    pub fn delay(self, op: StoreOp, by: Duration) -> Self {
        self.push(op, None, Effect::Delay(by))
    }

    /// Remove every registered fault.
    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    fn push(self, op: StoreOp, location: Option<String>, effect: Effect) -> Self {
        self.faults.lock().unwrap().push(Fault {
            op,
            location,
            effect,
        });
        self
    }

    async fn gate(&self, op: StoreOp, location: Option<&str>) -> Result<()> {
        let key = location.map(location_key);
        let matching: Vec<Effect> = self
            .faults
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.op == op)
            .filter(|f| match (&f.location, &key) {
                (None, _) => true,
                (Some(want), Some(got)) => want == got,
                (Some(_), None) => false,
            })
            .map(|f| f.effect.clone())
            .collect();

        for effect in matching {
            match effect {
                Effect::Delay(by) => tokio::time::sleep(by).await,
                Effect::Fail => bail!("injected {op:?} failure"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: DisasterStore> DisasterStore for FaultyStore<S> {
    async fn insert_live_event(&self, event: &LiveDisasterEvent) -> Result<i64> {
        self.gate(StoreOp::InsertLive, Some(&event.location)).await?;
        self.inner.insert_live_event(event).await
    }

    async fn update_live_event(&self, event: &LiveDisasterEvent) -> Result<()> {
        self.gate(StoreOp::UpdateLive, Some(&event.location)).await?;
        self.inner.update_live_event(event).await
    }

    async fn list_live_events(&self) -> Result<Vec<LiveDisasterEvent>> {
        self.gate(StoreOp::ListLive, None).await?;
        self.inner.list_live_events().await
    }

    async fn find_similar_live_event(
        &self,
        candidate: &LiveDisasterEvent,
    ) -> Result<Option<LiveDisasterEvent>> {
        self.gate(StoreOp::FindSimilarLive, Some(&candidate.location)).await?;
        self.inner.find_similar_live_event(candidate).await
    }

    async fn deactivate_stale_live_events(
        &self,
        touched: &HashSet<i64>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.gate(StoreOp::DeactivateStale, None).await?;
        self.inner.deactivate_stale_live_events(touched, now).await
    }

    async fn insert_history_event(&self, event: &HistoricalDisasterEvent) -> Result<i64> {
        self.gate(StoreOp::InsertHistory, Some(&event.location)).await?;
        self.inner.insert_history_event(event).await
    }

    async fn is_duplicate_history_event(
        &self,
        candidate: &HistoricalDisasterEvent,
    ) -> Result<bool> {
        self.gate(StoreOp::IsDuplicateHistory, Some(&candidate.location)).await?;
        self.inner.is_duplicate_history_event(candidate).await
    }

    async fn list_history(&self, limit: usize) -> Result<Vec<HistoricalDisasterEvent>> {
        self.gate(StoreOp::ListHistory, None).await?;
        self.inner.list_history(limit).await
    }
}

// ---------------------------------------------------------------------------
// Feed builders
// ---------------------------------------------------------------------------

/// Earthquake payload with the fields the crawler always sends.
pub fn earthquake(magnitude: f64, location: &str, time: &str) -> RawFields {
    fields(json!({
        "magnitude": magnitude,
        "location": location,
        "depth": "10km",
        "time": time,
        "source": "JMA",
    }))
}

/// Volcano payload with the fields the crawler always sends.
pub fn volcano(name: &str, alert_level: i32, time: &str) -> RawFields {
    fields(json!({
        "name": name,
        "alertLevel": alert_level,
        "status": "警戒",
        "time": time,
        "source": "JMA",
    }))
}

pub fn snapshot(earthquakes: Vec<RawFields>, volcanoes: Vec<RawFields>) -> FeedSnapshot {
    FeedSnapshot {
        earthquakes,
        volcanoes,
        last_updated: None,
    }
}

fn fields(value: serde_json::Value) -> RawFields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => RawFields::new(),
    }
}
