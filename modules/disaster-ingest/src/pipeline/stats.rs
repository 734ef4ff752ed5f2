use chrono::{DateTime, Utc};
use serde::Serialize;

use disaster_common::FeedKind;

/// Why one record was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReason {
    pub kind: FeedKind,
    /// Position in its snapshot list.
    pub index: usize,
    pub label: String,
    /// `field_parse` or `store_unavailable`.
    pub class: String,
    pub reason: String,
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records normalized and fully persisted (including those below every
    /// threshold, which need no writes).
    pub processed: u32,
    pub failed: u32,
    pub failure_reasons: Vec<FailureReason>,
    pub live_inserted: u32,
    pub live_updated: u32,
    pub history_inserted: u32,
    pub duplicates_skipped: u32,
    pub below_threshold: u32,
    pub timestamp_fallbacks: u32,
    pub deactivated: u64,
    pub sweep_error: Option<String>,
}

impl IngestionReport {
    pub fn new(run_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            processed: 0,
            failed: 0,
            failure_reasons: Vec::new(),
            live_inserted: 0,
            live_updated: 0,
            history_inserted: 0,
            duplicates_skipped: 0,
            below_threshold: 0,
            timestamp_fallbacks: 0,
            deactivated: 0,
            sweep_error: None,
        }
    }

    pub fn total_records(&self) -> u32 {
        self.processed + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.sweep_error.is_none()
    }
}

impl std::fmt::Display for IngestionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingestion Complete ({}) ===", self.run_id)?;
        writeln!(f, "Records processed:  {}", self.processed)?;
        writeln!(f, "Records failed:     {}", self.failed)?;
        writeln!(f, "Below threshold:    {}", self.below_threshold)?;
        writeln!(f, "Time fallbacks:     {}", self.timestamp_fallbacks)?;
        writeln!(f, "\nLive events:")?;
        writeln!(f, "  Inserted:    {}", self.live_inserted)?;
        writeln!(f, "  Updated:     {}", self.live_updated)?;
        writeln!(f, "  Deactivated: {}", self.deactivated)?;
        writeln!(f, "\nHistory:")?;
        writeln!(f, "  Inserted:    {}", self.history_inserted)?;
        writeln!(f, "  Duplicates:  {}", self.duplicates_skipped)?;
        if let Some(err) = &self.sweep_error {
            writeln!(f, "\nSweep failed: {err}")?;
        }
        if !self.failure_reasons.is_empty() {
            writeln!(f, "\nFailures:")?;
            for failure in &self.failure_reasons {
                writeln!(
                    f,
                    "  {} #{} ({}): {}",
                    failure.kind, failure.index, failure.label, failure.reason
                )?;
            }
        }
        Ok(())
    }
}
