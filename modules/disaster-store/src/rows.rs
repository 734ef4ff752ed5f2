// Row types as stored in Postgres, and their conversion to domain events.

use anyhow::Result;
use chrono::{DateTime, Utc};

use disaster_common::{DisasterType, HistoricalDisasterEvent, LiveDisasterEvent};

pub(crate) const LIVE_COLUMNS: &str = "id, disaster_type, title, location, magnitude, depth, \
     alert_level, status, started_at, expected_end, source, is_active, created_at, updated_at";

pub(crate) const HISTORY_COLUMNS: &str = "id, disaster_type, title, location, magnitude, depth, \
     alert_level, description, occurred_at, time_estimated, ended_at, source, created_at";

#[derive(Debug, sqlx::FromRow)]
pub struct LiveRow {
    pub id: i64,
    pub disaster_type: String,
    pub title: String,
    pub location: String,
    pub magnitude: Option<f64>,
    pub depth: Option<String>,
    pub alert_level: Option<String>,
    pub status: Option<String>,
    pub started_at: DateTime<Utc>,
    pub expected_end: Option<DateTime<Utc>>,
    pub source: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LiveRow> for LiveDisasterEvent {
    type Error = anyhow::Error;

    fn try_from(row: LiveRow) -> Result<Self> {
        Ok(LiveDisasterEvent {
            id: Some(row.id),
            disaster_type: row.disaster_type.parse::<DisasterType>()?,
            title: row.title,
            location: row.location,
            magnitude: row.magnitude,
            depth: row.depth,
            alert_level: row.alert_level,
            status: row.status,
            started_at: row.started_at,
            expected_end: row.expected_end,
            source: row.source,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub disaster_type: String,
    pub title: String,
    pub location: String,
    pub magnitude: Option<f64>,
    pub depth: Option<String>,
    pub alert_level: Option<String>,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub time_estimated: bool,
    pub ended_at: Option<DateTime<Utc>>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoricalDisasterEvent {
    type Error = anyhow::Error;

    fn try_from(row: HistoryRow) -> Result<Self> {
        Ok(HistoricalDisasterEvent {
            id: Some(row.id),
            disaster_type: row.disaster_type.parse::<DisasterType>()?,
            title: row.title,
            location: row.location,
            magnitude: row.magnitude,
            depth: row.depth,
            alert_level: row.alert_level,
            description: row.description,
            occurred_at: row.occurred_at,
            time_estimated: row.time_estimated,
            ended_at: row.ended_at,
            source: row.source,
            created_at: row.created_at,
        })
    }
}
