//! PgDisasterStore: live and historical disaster events backed by Postgres.
//!
//! `location_key` is computed on write from `matching::location_key`, so the
//! cluster and duplicate queries are plain equality lookups on an indexed column.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use disaster_common::matching::{cluster_key, location_key};
use disaster_common::{DisasterType, HistoricalDisasterEvent, LiveDisasterEvent, MatchRules};

use crate::rows::{HistoryRow, LiveRow, HISTORY_COLUMNS, LIVE_COLUMNS};

#[derive(Clone)]
pub struct PgDisasterStore {
    pool: PgPool,
    rules: MatchRules,
}

impl PgDisasterStore {
    pub fn new(pool: PgPool, rules: MatchRules) -> Self {
        Self { pool, rules }
    }

    /// Open a small pool against `url`.
    pub async fn connect(url: &str, rules: MatchRules) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self::new(pool, rules))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn rules(&self) -> MatchRules {
        self.rules
    }

    // --- Live events ---

    pub async fn insert_live(&self, event: &LiveDisasterEvent) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO disaster_event_live
                (disaster_type, title, location, location_key, magnitude, depth, alert_level,
                 status, started_at, expected_end, source, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(event.disaster_type.as_str())
        .bind(&event.title)
        .bind(&event.location)
        .bind(location_key(&event.location))
        .bind(event.magnitude)
        .bind(&event.depth)
        .bind(&event.alert_level)
        .bind(&event.status)
        .bind(event.started_at)
        .bind(event.expected_end)
        .bind(&event.source)
        .bind(event.is_active)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    pub async fn update_live(&self, event: &LiveDisasterEvent) -> Result<()> {
        let id = event
            .id
            .ok_or_else(|| anyhow!("cannot update a live event without an id"))?;

        let result = sqlx::query(
            r#"
            UPDATE disaster_event_live
            SET title = $2, location = $3, location_key = $4, magnitude = $5, depth = $6,
                alert_level = $7, status = $8, started_at = $9, expected_end = $10,
                source = $11, is_active = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(location_key(&event.location))
        .bind(event.magnitude)
        .bind(&event.depth)
        .bind(&event.alert_level)
        .bind(&event.status)
        .bind(event.started_at)
        .bind(event.expected_end)
        .bind(&event.source)
        .bind(event.is_active)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("live event {id} not found"));
        }
        Ok(())
    }

    /// Active live events, most recently started first.
    pub async fn list_live(&self) -> Result<Vec<LiveDisasterEvent>> {
        let sql = format!(
            "SELECT {LIVE_COLUMNS} FROM disaster_event_live \
             WHERE is_active ORDER BY started_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, LiveRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LiveDisasterEvent::try_from).collect()
    }

    /// The active live event in the same cluster, if any.
    pub async fn find_similar_live(
        &self,
        disaster_type: DisasterType,
        location: &str,
    ) -> Result<Option<LiveDisasterEvent>> {
        let sql = format!(
            "SELECT {LIVE_COLUMNS} FROM disaster_event_live \
             WHERE disaster_type = $1 AND location_key = $2 AND is_active \
             ORDER BY updated_at DESC, id DESC LIMIT 1"
        );
        let (disaster_type, key) = cluster_key(disaster_type, location);
        let row = sqlx::query_as::<_, LiveRow>(&sql)
            .bind(disaster_type.as_str())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LiveDisasterEvent::try_from).transpose()
    }

    /// Deactivate every active live event whose id is not in `touched`.
    /// Returns the number of rows retired.
    pub async fn deactivate_stale(&self, touched: &[i64], now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE disaster_event_live
            SET is_active = FALSE, updated_at = $2
            WHERE is_active AND NOT (id = ANY($1))
            "#,
        )
        .bind(touched)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(
            touched = touched.len(),
            deactivated = result.rows_affected(),
            "Stale live events swept"
        );
        Ok(result.rows_affected())
    }

    // --- History ---

    pub async fn insert_history(&self, event: &HistoricalDisasterEvent) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO disaster_history
                (disaster_type, title, location, location_key, magnitude, depth, alert_level,
                 description, occurred_at, time_estimated, ended_at, source, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(event.disaster_type.as_str())
        .bind(&event.title)
        .bind(&event.location)
        .bind(location_key(&event.location))
        .bind(event.magnitude)
        .bind(&event.depth)
        .bind(&event.alert_level)
        .bind(&event.description)
        .bind(event.occurred_at)
        .bind(event.time_estimated)
        .bind(event.ended_at)
        .bind(&event.source)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Whether a history row already records `candidate`. See
    /// `MatchRules::history_matches` for the rule this query mirrors.
    pub async fn is_duplicate_history(&self, candidate: &HistoricalDisasterEvent) -> Result<bool> {
        let row = if candidate.time_estimated {
            sqlx::query_as::<_, (bool,)>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM disaster_history
                    WHERE disaster_type = $1
                      AND location_key = $2
                      AND magnitude IS NOT DISTINCT FROM $3
                      AND alert_level IS NOT DISTINCT FROM $4
                )
                "#,
            )
            .bind(candidate.disaster_type.as_str())
            .bind(location_key(&candidate.location))
            .bind(candidate.magnitude)
            .bind(&candidate.alert_level)
            .fetch_one(&self.pool)
            .await?
        } else {
            let (from, to) = self.rules.window_bounds(candidate.occurred_at);
            sqlx::query_as::<_, (bool,)>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM disaster_history
                    WHERE disaster_type = $1
                      AND location_key = $2
                      AND occurred_at BETWEEN $3 AND $4
                )
                "#,
            )
            .bind(candidate.disaster_type.as_str())
            .bind(location_key(&candidate.location))
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await?
        };

        Ok(row.0)
    }

    /// Most recent history rows by occurrence time.
    pub async fn list_history(&self, limit: usize) -> Result<Vec<HistoricalDisasterEvent>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM disaster_history \
             ORDER BY occurred_at DESC, id DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(HistoricalDisasterEvent::try_from)
            .collect()
    }
}
