use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};

use disaster_common::FeedSnapshot;

/// The last raw snapshot handed to the ingestor, kept for read-back display.
pub struct CachedSnapshot {
    pub snapshot: FeedSnapshot,
    pub received_at: DateTime<Utc>,
}

/// Lock-free holder of the latest snapshot. Readers get an owned `Arc`, so
/// a concurrent `replace` never changes what they are looking at.
#[derive(Default)]
pub struct SnapshotCache {
    inner: ArcSwapOption<CachedSnapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, snapshot: FeedSnapshot, received_at: DateTime<Utc>) {
        self.inner.store(Some(Arc::new(CachedSnapshot {
            snapshot,
            received_at,
        })));
    }

    pub fn latest(&self) -> Option<Arc<CachedSnapshot>> {
        self.inner.load_full()
    }

    pub fn clear(&self) {
        self.inner.store(None);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snap(last_updated: &str) -> FeedSnapshot {
        FeedSnapshot {
            last_updated: Some(last_updated.into()),
            ..FeedSnapshot::default()
        }
    }

    #[test]
    fn starts_empty() {
        let cache = SnapshotCache::new();
        assert!(cache.is_empty());
        assert!(cache.latest().is_none());
    }

    #[test]
    fn replace_swaps_without_disturbing_readers() {
        let cache = SnapshotCache::new();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 1, 1, 1, 0).unwrap();

        cache.replace(snap("first"), t1);
        let held = cache.latest().unwrap();

        cache.replace(snap("second"), t2);
        assert_eq!(held.snapshot.last_updated.as_deref(), Some("first"));

        let current = cache.latest().unwrap();
        assert_eq!(current.snapshot.last_updated.as_deref(), Some("second"));
        assert_eq!(current.received_at, t2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = SnapshotCache::new();
        cache.replace(snap("x"), Utc::now());
        cache.clear();
        assert!(cache.is_empty());
    }
}
