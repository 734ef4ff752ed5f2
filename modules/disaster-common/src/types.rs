use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DisasterError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisasterType {
    Earthquake,
    Tsunami,
    Typhoon,
    Flood,
    Volcano,
    Fire,
    Landslide,
    Other,
}

impl DisasterType {
    pub const ALL: [DisasterType; 8] = [
        DisasterType::Earthquake,
        DisasterType::Tsunami,
        DisasterType::Typhoon,
        DisasterType::Flood,
        DisasterType::Volcano,
        DisasterType::Fire,
        DisasterType::Landslide,
        DisasterType::Other,
    ];

    /// Stored/wire name, e.g. `EARTHQUAKE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterType::Earthquake => "EARTHQUAKE",
            DisasterType::Tsunami => "TSUNAMI",
            DisasterType::Typhoon => "TYPHOON",
            DisasterType::Flood => "FLOOD",
            DisasterType::Volcano => "VOLCANO",
            DisasterType::Fire => "FIRE",
            DisasterType::Landslide => "LANDSLIDE",
            DisasterType::Other => "OTHER",
        }
    }

    /// Japanese label shown to end users.
    pub fn display_name(&self) -> &'static str {
        match self {
            DisasterType::Earthquake => "地震",
            DisasterType::Tsunami => "津波",
            DisasterType::Typhoon => "台風",
            DisasterType::Flood => "豪雨・洪水",
            DisasterType::Volcano => "火山",
            DisasterType::Fire => "火事",
            DisasterType::Landslide => "山崩れ",
            DisasterType::Other => "その他",
        }
    }

    /// Reverse lookup from the display label (used by search inputs).
    pub fn from_display_name(name: &str) -> Option<DisasterType> {
        let name = name.trim();
        Self::ALL.into_iter().find(|t| t.display_name() == name)
    }
}

impl std::fmt::Display for DisasterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DisasterType {
    type Err = DisasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| DisasterError::UnknownDisasterType(s.to_string()))
    }
}

/// Which list of a snapshot a raw record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Earthquake,
    Volcano,
}

impl FeedKind {
    pub fn disaster_type(&self) -> DisasterType {
        match self {
            FeedKind::Earthquake => DisasterType::Earthquake,
            FeedKind::Volcano => DisasterType::Volcano,
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::Earthquake => write!(f, "earthquake"),
            FeedKind::Volcano => write!(f, "volcano"),
        }
    }
}

// --- Stored events ---

/// A disaster that is currently being reported by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LiveDisasterEvent {
    /// Store-assigned identity. `None` until inserted.
    pub id: Option<i64>,
    pub disaster_type: DisasterType,
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

/// An append-only record of a disaster occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoricalDisasterEvent {
    pub id: Option<i64>,
    pub disaster_type: DisasterType,
    pub title: String,
    pub location: String,
    pub magnitude: Option<f64>,
    pub depth: Option<String>,
    pub alert_level: Option<String>,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    /// Set when the feed time could not be read and `occurred_at` was
    /// substituted. Such rows are matched by content instead of by time.
    #[serde(default)]
    pub time_estimated: bool,
    pub ended_at: Option<DateTime<Utc>>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

// --- Ingress ---

/// Untyped key/value payload for one reported phenomenon.
pub type RawFields = serde_json::Map<String, serde_json::Value>;

/// One record from a feed snapshot, tagged with the list it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedRecord {
    pub kind: FeedKind,
    pub fields: RawFields,
}

impl RawFeedRecord {
    pub fn new(kind: FeedKind, fields: RawFields) -> Self {
        Self { kind, fields }
    }

    /// Short human label for log lines: location/name when present.
    pub fn label(&self) -> String {
        let key = match self.kind {
            FeedKind::Earthquake => "location",
            FeedKind::Volcano => "name",
        };
        match self.fields.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "<unknown>".to_string(),
        }
    }
}

/// One pull of the disaster feed, as delivered by the crawler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    #[serde(default)]
    pub earthquakes: Vec<RawFields>,
    #[serde(default)]
    pub volcanoes: Vec<RawFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl FeedSnapshot {
    pub fn earthquake_records(&self) -> Vec<RawFeedRecord> {
        self.earthquakes
            .iter()
            .cloned()
            .map(|f| RawFeedRecord::new(FeedKind::Earthquake, f))
            .collect()
    }

    pub fn volcano_records(&self) -> Vec<RawFeedRecord> {
        self.volcanoes
            .iter()
            .cloned()
            .map(|f| RawFeedRecord::new(FeedKind::Volcano, f))
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.earthquakes.len() + self.volcanoes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disaster_type_parses_case_insensitively() {
        assert_eq!("earthquake".parse::<DisasterType>().unwrap(), DisasterType::Earthquake);
        assert_eq!(" VOLCANO ".parse::<DisasterType>().unwrap(), DisasterType::Volcano);
        assert!("meteor".parse::<DisasterType>().is_err());
    }

    #[test]
    fn display_name_round_trips_through_lookup() {
        for t in DisasterType::ALL {
            assert_eq!(DisasterType::from_display_name(t.display_name()), Some(t));
        }
        assert_eq!(DisasterType::from_display_name(" 火山 "), Some(DisasterType::Volcano));
        assert_eq!(DisasterType::from_display_name("隕石"), None);
    }

    #[test]
    fn disaster_type_serializes_as_screaming_snake() {
        let v = serde_json::to_value(DisasterType::Landslide).unwrap();
        assert_eq!(v, json!("LANDSLIDE"));
    }

    #[test]
    fn snapshot_ignores_placeholder_lists() {
        let snapshot: FeedSnapshot = serde_json::from_value(json!({
            "earthquakes": [{"magnitude": "4.8", "location": "Chiba"}],
            "volcanoes": [],
            "tsunamis": [],
            "typhoons": [],
            "lastUpdated": "2024-03-01T01:00:00.000Z",
            "totalCount": 1
        }))
        .unwrap();

        assert_eq!(snapshot.earthquakes.len(), 1);
        assert_eq!(snapshot.last_updated.as_deref(), Some("2024-03-01T01:00:00.000Z"));
        let records = snapshot.earthquake_records();
        assert_eq!(records[0].kind, FeedKind::Earthquake);
        assert_eq!(records[0].label(), "Chiba");
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let snapshot: FeedSnapshot = serde_json::from_value(json!({})).unwrap();
        assert_eq!(snapshot.total_records(), 0);
    }
}
