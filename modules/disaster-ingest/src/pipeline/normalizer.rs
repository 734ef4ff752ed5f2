//! Feed normalization: loosely-typed feed payloads → typed reports.
//!
//! Numeric fields accept JSON numbers or numeric strings. Timestamps try a
//! fixed list of formats and fall back to the ingestion time when none
//! parse. The fallback is a known approximation: a report with an
//! unreadable time is treated as if it happened when it was ingested, and
//! is flagged so the pass can count and log it.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use disaster_common::{FeedKind, IngestConfig, RawFeedRecord};

use crate::error::IngestError;

/// Offset-less formats, tried in order. The first is the browser
/// `toLocaleString` shape (`2024. 3. 1. 오후 2:05:30`) after meridiem
/// markers are rewritten to AM/PM.
const NAIVE_PATTERNS: &[&str] = &[
    "%Y. %m. %d. %p %I:%M:%S",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const MERIDIEM_MARKERS: &[(&str, &str)] = &[
    ("오전", "AM"),
    ("오후", "PM"),
    ("午前", "AM"),
    ("午後", "PM"),
];

/// Placeholder values crawlers emit for "unknown".
const UNKNOWN_MARKERS: &[&str] = &["N/A", "n/a", "-", "不明"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedTimestamp {
    pub at: DateTime<Utc>,
    /// True when no pattern matched and the fallback time was substituted.
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeReport {
    pub magnitude: f64,
    pub location: String,
    pub depth: Option<String>,
    pub source: String,
    pub occurred_at: ParsedTimestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolcanoReport {
    pub name: String,
    pub alert_level: i32,
    pub status: Option<String>,
    pub source: String,
    pub observed_at: ParsedTimestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedReport {
    Earthquake(EarthquakeReport),
    Volcano(VolcanoReport),
}

impl NormalizedReport {
    pub fn kind(&self) -> FeedKind {
        match self {
            NormalizedReport::Earthquake(_) => FeedKind::Earthquake,
            NormalizedReport::Volcano(_) => FeedKind::Volcano,
        }
    }

    pub fn timestamp_fallback(&self) -> bool {
        match self {
            NormalizedReport::Earthquake(r) => r.occurred_at.fallback,
            NormalizedReport::Volcano(r) => r.observed_at.fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Normalize one raw record. Fails only on missing or malformed required
/// fields; timestamps never fail. An unreadable time becomes `fallback_at`.
pub fn normalize(
    record: &RawFeedRecord,
    config: &IngestConfig,
    fallback_at: DateTime<Utc>,
) -> Result<NormalizedReport, IngestError> {
    let fields = &record.fields;
    let source = text(fields.get("source")).unwrap_or_else(|| config.default_source.clone());
    let time = text(fields.get("time"));
    let parsed_time = parse_timestamp(time.as_deref(), config.feed_offset, fallback_at);

    match record.kind {
        FeedKind::Earthquake => {
            let magnitude = number("magnitude", fields.get("magnitude"))?;
            let location = required_text("location", fields.get("location"))?;
            Ok(NormalizedReport::Earthquake(EarthquakeReport {
                magnitude,
                location,
                depth: text(fields.get("depth")),
                source,
                occurred_at: parsed_time,
            }))
        }
        FeedKind::Volcano => {
            let alert_level = integer("alertLevel", fields.get("alertLevel"))?;
            let name = required_text("name", fields.get("name"))?;
            Ok(NormalizedReport::Volcano(VolcanoReport {
                name,
                alert_level,
                status: text(fields.get("status")),
                source,
                observed_at: parsed_time,
            }))
        }
    }
}

/// Parse a feed timestamp. Naive times are read in `offset`.
pub fn parse_timestamp(
    raw: Option<&str>,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> ParsedTimestamp {
    let parsed = raw.and_then(|raw| try_parse(raw.trim(), offset));
    match parsed {
        Some(at) => ParsedTimestamp {
            at,
            fallback: false,
        },
        None => ParsedTimestamp {
            at: now,
            fallback: true,
        },
    }
}

fn try_parse(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    let mut candidate = raw.to_string();
    for (marker, replacement) in MERIDIEM_MARKERS {
        candidate = candidate.replace(marker, replacement);
    }

    for pattern in NAIVE_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&candidate, pattern) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Non-blank text, with numbers rendered as text. Unknown markers read as absent.
fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() || UNKNOWN_MARKERS.contains(&s.as_str()) {
        None
    } else {
        Some(s)
    }
}

fn required_text(field: &'static str, value: Option<&Value>) -> Result<String, IngestError> {
    text(value).ok_or_else(|| IngestError::missing(field))
}

fn number(field: &'static str, value: Option<&Value>) -> Result<f64, IngestError> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(IngestError::missing(field)),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(IngestError::malformed(
            field,
            format!("not a number: {}", describe(value)),
        )),
    }
}

fn integer(field: &'static str, value: Option<&Value>) -> Result<i32, IngestError> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(IngestError::missing(field)),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    parsed
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| IngestError::malformed(field, format!("not an integer: {}", describe(value))))
}

fn describe(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_default()
}
