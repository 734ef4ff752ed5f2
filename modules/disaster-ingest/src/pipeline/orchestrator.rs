//! One ingestion pass over a feed snapshot.
//!
//! Phases run in a fixed order:
//! `Start → NormalizeEarthquakes → NormalizeVolcanoes → Sweep → Done`.
//! Each record is normalized, classified and resolved on its own; a failure
//! drops that record only. The sweep runs once, after both lists, whatever
//! happened to individual records. There is no rollback: writes that
//! succeeded before a failure stay.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use disaster_common::{FeedSnapshot, IngestConfig, RawFeedRecord};

use super::classifier::classify;
use super::dedup::{resolve_history, resolve_live, HistoryResolution, LiveResolution};
use super::normalizer::{normalize, parse_timestamp};
use super::stats::{FailureReason, IngestionReport};
use super::sweeper::sweep;
use crate::error::IngestError;
use crate::traits::DisasterStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Start,
    NormalizeEarthquakes,
    NormalizeVolcanoes,
    Sweep,
    Done,
}

impl IngestPhase {
    pub fn next(self) -> IngestPhase {
        match self {
            IngestPhase::Start => IngestPhase::NormalizeEarthquakes,
            IngestPhase::NormalizeEarthquakes => IngestPhase::NormalizeVolcanoes,
            IngestPhase::NormalizeVolcanoes => IngestPhase::Sweep,
            IngestPhase::Sweep | IngestPhase::Done => IngestPhase::Done,
        }
    }
}

impl std::fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IngestPhase::Start => "start",
            IngestPhase::NormalizeEarthquakes => "normalize_earthquakes",
            IngestPhase::NormalizeVolcanoes => "normalize_volcanoes",
            IngestPhase::Sweep => "sweep",
            IngestPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Mutable state threaded through one pass.
struct Pass {
    report: IngestionReport,
    touched: HashSet<i64>,
    now: DateTime<Utc>,
    /// Stands in for record times that cannot be read.
    fallback_at: DateTime<Utc>,
}

pub struct Ingestor {
    store: Arc<dyn DisasterStore>,
    config: IngestConfig,
    run_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn DisasterStore>, config: IngestConfig) -> Self {
        Self {
            store,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn DisasterStore> {
        &self.store
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest a snapshot at the current time. Never fails; everything that
    /// went wrong is in the report.
    pub async fn ingest(&self, snapshot: &FeedSnapshot) -> IngestionReport {
        self.ingest_at(snapshot, Utc::now()).await
    }

    /// Ingest a snapshot with an explicit ingestion time. `now` stamps
    /// created/updated times and the sweep. Unreadable record times take the
    /// snapshot's `lastUpdated` when it parses, otherwise `now`.
    pub async fn ingest_at(&self, snapshot: &FeedSnapshot, now: DateTime<Utc>) -> IngestionReport {
        // Passes on one ingestor never interleave.
        let _guard = self.run_lock.lock().await;

        let run_id = format!("ingest-{}", Uuid::new_v4());
        let mut pass = Pass {
            report: IngestionReport::new(run_id, now),
            touched: HashSet::new(),
            now,
            fallback_at: self.fallback_time(snapshot, now),
        };

        let mut phase = IngestPhase::Start;
        while phase != IngestPhase::Done {
            match phase {
                IngestPhase::Start => {
                    info!(
                        run_id = pass.report.run_id.as_str(),
                        earthquakes = snapshot.earthquakes.len(),
                        volcanoes = snapshot.volcanoes.len(),
                        last_updated = snapshot.last_updated.as_deref().unwrap_or("-"),
                        "Ingestion pass started"
                    );
                }
                IngestPhase::NormalizeEarthquakes => {
                    self.process_list(&snapshot.earthquake_records(), &mut pass).await;
                }
                IngestPhase::NormalizeVolcanoes => {
                    self.process_list(&snapshot.volcano_records(), &mut pass).await;
                }
                IngestPhase::Sweep => self.sweep(&mut pass).await,
                IngestPhase::Done => {}
            }
            phase = phase.next();
        }

        let mut report = pass.report;
        report.finished_at = Utc::now().max(report.started_at);
        info!(
            run_id = report.run_id.as_str(),
            processed = report.processed,
            failed = report.failed,
            live_inserted = report.live_inserted,
            live_updated = report.live_updated,
            history_inserted = report.history_inserted,
            duplicates_skipped = report.duplicates_skipped,
            deactivated = report.deactivated,
            "Ingestion pass finished"
        );
        report
    }

    fn fallback_time(&self, snapshot: &FeedSnapshot, now: DateTime<Utc>) -> DateTime<Utc> {
        parse_timestamp(snapshot.last_updated.as_deref(), self.config.feed_offset, now).at
    }

    async fn process_list(&self, records: &[RawFeedRecord], pass: &mut Pass) {
        for (index, record) in records.iter().enumerate() {
            match self.process_record(record, pass).await {
                Ok(()) => pass.report.processed += 1,
                Err(e) => {
                    let label = record.label();
                    warn!(
                        run_id = pass.report.run_id.as_str(),
                        kind = %record.kind,
                        index,
                        location = label.as_str(),
                        error = %e,
                        "Record dropped"
                    );
                    pass.report.failed += 1;
                    pass.report.failure_reasons.push(FailureReason {
                        kind: record.kind,
                        index,
                        label,
                        class: e.class().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Counters are bumped as each write lands, so a record that fails
    /// halfway still accounts for what it persisted.
    async fn process_record(&self, record: &RawFeedRecord, pass: &mut Pass) -> Result<(), IngestError> {
        let report = normalize(record, &self.config, pass.fallback_at)?;

        if report.timestamp_fallback() {
            warn!(
                run_id = pass.report.run_id.as_str(),
                kind = %record.kind,
                location = record.label().as_str(),
                fallback_at = %pass.fallback_at,
                "Unparseable time, using fallback time"
            );
            pass.report.timestamp_fallbacks += 1;
        }

        let classification = classify(&report, &self.config, pass.now);
        if classification.is_empty() {
            pass.report.below_threshold += 1;
            return Ok(());
        }

        let limit = self.config.store_timeout;

        if let Some(live) = &classification.live {
            let resolution = resolve_live(self.store.as_ref(), live, limit).await?;
            pass.touched.insert(resolution.id());
            match resolution {
                LiveResolution::Inserted(_) => pass.report.live_inserted += 1,
                LiveResolution::Updated(_) => pass.report.live_updated += 1,
            }
        }

        if let Some(history) = &classification.history {
            match resolve_history(self.store.as_ref(), history, limit).await? {
                HistoryResolution::Inserted(_) => pass.report.history_inserted += 1,
                HistoryResolution::DuplicateSkipped => pass.report.duplicates_skipped += 1,
            }
        }

        Ok(())
    }

    async fn sweep(&self, pass: &mut Pass) {
        match sweep(
            self.store.as_ref(),
            &pass.touched,
            pass.now,
            self.config.store_timeout,
        )
        .await
        {
            Ok(retired) => pass.report.deactivated = retired,
            Err(e) => {
                warn!(
                    run_id = pass.report.run_id.as_str(),
                    error = %e,
                    "Retention sweep failed"
                );
                pass.report.sweep_error = Some(e.to_string());
            }
        }
    }
}
