//! Dedup resolution against the store.
//!
//! Live candidates collapse onto the active event of their cluster (update
//! in place) or become a new event. Historical candidates are dropped when
//! the store already holds a duplicate.

use std::time::Duration;

use tracing::debug;

use disaster_common::{HistoricalDisasterEvent, LiveDisasterEvent};

use super::bounded;
use crate::error::IngestError;
use crate::traits::DisasterStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveResolution {
    Inserted(i64),
    Updated(i64),
}

impl LiveResolution {
    pub fn id(&self) -> i64 {
        match self {
            LiveResolution::Inserted(id) | LiveResolution::Updated(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryResolution {
    Inserted(i64),
    DuplicateSkipped,
}

/// Fold a sighting into the existing event of the same cluster.
///
/// Identity and creation time survive. The reported fields and the start
/// come from whichever sighting started later, so a feed listed newest
/// first cannot roll an event back to an older reading. Equal starts take
/// the candidate, which carries revised readings of the same event.
pub fn merge_live(existing: &LiveDisasterEvent, candidate: &LiveDisasterEvent) -> LiveDisasterEvent {
    let latest = if candidate.started_at >= existing.started_at {
        candidate
    } else {
        existing
    };
    LiveDisasterEvent {
        id: existing.id,
        disaster_type: existing.disaster_type,
        title: latest.title.clone(),
        location: existing.location.clone(),
        magnitude: latest.magnitude,
        depth: latest.depth.clone(),
        alert_level: latest.alert_level.clone(),
        status: latest.status.clone(),
        started_at: latest.started_at,
        expected_end: latest.expected_end.or(existing.expected_end).or(candidate.expected_end),
        source: latest.source.clone(),
        is_active: true,
        created_at: existing.created_at,
        updated_at: candidate.updated_at.max(existing.updated_at),
    }
}

pub async fn resolve_live(
    store: &dyn DisasterStore,
    candidate: &LiveDisasterEvent,
    limit: Duration,
) -> Result<LiveResolution, IngestError> {
    let similar = bounded(
        "find_similar_live_event",
        limit,
        store.find_similar_live_event(candidate),
    )
    .await?;

    match similar {
        Some(existing) => {
            let Some(id) = existing.id else {
                return Err(IngestError::StoreUnavailable {
                    operation: "find_similar_live_event",
                    reason: "store returned a live event without an id".to_string(),
                });
            };
            let merged = merge_live(&existing, candidate);
            bounded("update_live_event", limit, store.update_live_event(&merged)).await?;
            debug!(id, location = merged.location.as_str(), "Live event updated in place");
            Ok(LiveResolution::Updated(id))
        }
        None => {
            let id = bounded("insert_live_event", limit, store.insert_live_event(candidate)).await?;
            debug!(id, location = candidate.location.as_str(), "Live event inserted");
            Ok(LiveResolution::Inserted(id))
        }
    }
}

pub async fn resolve_history(
    store: &dyn DisasterStore,
    candidate: &HistoricalDisasterEvent,
    limit: Duration,
) -> Result<HistoryResolution, IngestError> {
    let duplicate = bounded(
        "is_duplicate_history_event",
        limit,
        store.is_duplicate_history_event(candidate),
    )
    .await?;

    if duplicate {
        debug!(location = candidate.location.as_str(), "Duplicate history skipped");
        return Ok(HistoryResolution::DuplicateSkipped);
    }

    let id = bounded(
        "insert_history_event",
        limit,
        store.insert_history_event(candidate),
    )
    .await?;
    debug!(id, location = candidate.location.as_str(), "History event inserted");
    Ok(HistoryResolution::Inserted(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDisasterStore;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use disaster_common::DisasterType;

    const LIMIT: Duration = Duration::from_secs(1);

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap() + ChronoDuration::minutes(minutes)
    }

    fn live(location: &str, magnitude: f64, minutes: i64) -> LiveDisasterEvent {
        LiveDisasterEvent {
            id: None,
            disaster_type: DisasterType::Earthquake,
            title: format!("{magnitude} magnitude earthquake"),
            location: location.into(),
            magnitude: Some(magnitude),
            depth: Some("10km".into()),
            alert_level: None,
            status: None,
            started_at: at(minutes),
            expected_end: None,
            source: "JMA".into(),
            is_active: true,
            created_at: at(minutes),
            updated_at: at(minutes),
        }
    }

    fn history(location: &str, minutes: i64) -> HistoricalDisasterEvent {
        HistoricalDisasterEvent {
            id: None,
            disaster_type: DisasterType::Earthquake,
            title: "5.2 magnitude earthquake".into(),
            location: location.into(),
            magnitude: Some(5.2),
            depth: None,
            alert_level: None,
            description: "test".into(),
            occurred_at: at(minutes),
            time_estimated: false,
            ended_at: None,
            source: "JMA".into(),
            created_at: at(minutes),
        }
    }

    #[test]
    fn merge_keeps_identity_and_takes_later_sighting() {
        let mut existing = live("Tokyo Bay", 5.2, 0);
        existing.id = Some(7);
        let candidate = live("tokyo bay", 5.6, 10);

        let merged = merge_live(&existing, &candidate);
        assert_eq!(merged.id, Some(7));
        assert_eq!(merged.location, "Tokyo Bay");
        assert_eq!(merged.magnitude, Some(5.6));
        assert_eq!(merged.title, "5.6 magnitude earthquake");
        assert_eq!(merged.started_at, at(10));
        assert_eq!(merged.created_at, at(0));
        assert_eq!(merged.updated_at, at(10));
        assert!(merged.is_active);
    }

    #[test]
    fn older_sighting_does_not_overwrite_newer_reading() {
        let mut existing = live("Tokyo Bay", 5.6, 30);
        existing.id = Some(7);
        let mut older = live("Tokyo Bay", 5.2, 0);
        older.updated_at = at(31);

        let merged = merge_live(&existing, &older);
        assert_eq!(merged.magnitude, Some(5.6));
        assert_eq!(merged.title, "5.6 magnitude earthquake");
        assert_eq!(merged.started_at, at(30));
        assert_eq!(merged.updated_at, at(31));
    }

    #[test]
    fn revised_reading_of_same_start_wins() {
        let existing = live("Tokyo Bay", 5.2, 0);
        let mut revised = live("Tokyo Bay", 5.4, 0);
        revised.updated_at = at(3);

        let merged = merge_live(&existing, &revised);
        assert_eq!(merged.magnitude, Some(5.4));
        assert_eq!(merged.updated_at, at(3));
    }

    #[tokio::test]
    async fn newest_first_feed_keeps_newest_reading() {
        let store = MemoryDisasterStore::default();
        let mut newest = live("Tokyo Bay", 5.6, 30);
        newest.updated_at = at(40);
        let mut older = live("Tokyo Bay", 5.2, 0);
        older.updated_at = at(40);

        resolve_live(&store, &newest, LIMIT).await.unwrap();
        resolve_live(&store, &older, LIMIT).await.unwrap();
        resolve_live(&store, &newest, LIMIT).await.unwrap();
        resolve_live(&store, &older, LIMIT).await.unwrap();

        let all = store.all_live_events();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].magnitude, Some(5.6));
        assert_eq!(all[0].started_at, at(30));
    }

    #[tokio::test]
    async fn first_sighting_inserts_then_repeat_updates() {
        let store = MemoryDisasterStore::default();

        let first = resolve_live(&store, &live("Tokyo Bay", 5.2, 0), LIMIT).await.unwrap();
        let LiveResolution::Inserted(id) = first else {
            panic!("expected insert, got {first:?}");
        };

        let second = resolve_live(&store, &live("TOKYO  BAY", 5.3, 5), LIMIT).await.unwrap();
        assert_eq!(second, LiveResolution::Updated(id));

        let all = store.all_live_events();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].magnitude, Some(5.3));
        assert_eq!(all[0].updated_at, at(5));
    }

    #[tokio::test]
    async fn different_clusters_insert_separately() {
        let store = MemoryDisasterStore::default();
        let a = resolve_live(&store, &live("Tokyo Bay", 5.2, 0), LIMIT).await.unwrap();
        let b = resolve_live(&store, &live("Chiba", 5.2, 0), LIMIT).await.unwrap();
        assert!(matches!(a, LiveResolution::Inserted(_)));
        assert!(matches!(b, LiveResolution::Inserted(_)));
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn history_duplicate_is_skipped() {
        let store = MemoryDisasterStore::default();
        let first = resolve_history(&store, &history("Tokyo Bay", 0), LIMIT).await.unwrap();
        assert!(matches!(first, HistoryResolution::Inserted(_)));

        let again = resolve_history(&store, &history("Tokyo Bay", 10), LIMIT).await.unwrap();
        assert_eq!(again, HistoryResolution::DuplicateSkipped);
        assert_eq!(store.history_len(), 1);
    }

    #[tokio::test]
    async fn history_outside_window_is_inserted() {
        let store = MemoryDisasterStore::default();
        resolve_history(&store, &history("Tokyo Bay", 0), LIMIT).await.unwrap();
        let later = resolve_history(&store, &history("Tokyo Bay", 180), LIMIT).await.unwrap();
        assert!(matches!(later, HistoryResolution::Inserted(_)));
        assert_eq!(store.history_len(), 2);
    }
}
