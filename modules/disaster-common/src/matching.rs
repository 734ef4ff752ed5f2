//! Equivalence rules shared by every store implementation.
//!
//! Two reports describe the same live "cluster" when they have the same
//! disaster type and the same location key. A historical candidate is a
//! duplicate when an existing row shares type and location key and its
//! `occurred_at` lies within [`MatchRules::history_window`]. Candidates whose
//! time was estimated are matched on reported content (magnitude and alert
//! level) instead, since their `occurred_at` moves with each ingestion.

use chrono::{DateTime, Duration, Utc};

use crate::types::{DisasterType, HistoricalDisasterEvent};

/// Default tolerance for historical duplicate detection.
pub const DEFAULT_HISTORY_WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRules {
    pub history_window: Duration,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            history_window: Duration::minutes(DEFAULT_HISTORY_WINDOW_MINUTES),
        }
    }
}

impl MatchRules {
    pub fn new(history_window: Duration) -> Self {
        Self { history_window }
    }

    /// True when two occurrence times are close enough to be the same event.
    pub fn within_window(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        (a - b).abs() <= self.history_window
    }

    /// Whether `existing` already records `candidate`.
    pub fn history_matches(
        &self,
        existing: &HistoricalDisasterEvent,
        candidate: &HistoricalDisasterEvent,
    ) -> bool {
        if cluster_key(existing.disaster_type, &existing.location)
            != cluster_key(candidate.disaster_type, &candidate.location)
        {
            return false;
        }
        if candidate.time_estimated {
            existing.magnitude == candidate.magnitude && existing.alert_level == candidate.alert_level
        } else {
            self.within_window(existing.occurred_at, candidate.occurred_at)
        }
    }

    /// Inclusive bounds for a range query around `at`.
    pub fn window_bounds(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (at - self.history_window, at + self.history_window)
    }
}

/// Canonical form of a free-text location.
///
/// Full-width ASCII (as emitted by Japanese feeds) is folded to half-width,
/// then the text is lowercased and whitespace runs collapse to one space.
pub fn location_key(location: &str) -> String {
    let folded: String = location.chars().map(fold_width).collect();
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_width(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

/// Cluster identity for a live event.
pub fn cluster_key(disaster_type: DisasterType, location: &str) -> (DisasterType, String) {
    (disaster_type, location_key(location))
}
