//! P2PQuake reports → feed snapshots.
//!
//! Unknown hypocenter values are left out of the record rather than
//! guessed, so the normalizer drops reports without a magnitude or name.

use serde_json::Value;

use disaster_common::{FeedSnapshot, RawFields};
use p2pquake_client::{JmaQuake, P2pQuakeClient};

pub const P2PQUAKE_SOURCE: &str = "P2PQuake";

pub fn snapshot_from_quakes(quakes: &[JmaQuake]) -> FeedSnapshot {
    FeedSnapshot {
        earthquakes: quakes.iter().map(quake_fields).collect(),
        volcanoes: Vec::new(),
        last_updated: quakes.iter().find_map(|q| q.time.clone()),
    }
}

pub async fn fetch_snapshot(client: &P2pQuakeClient, limit: u32) -> p2pquake_client::Result<FeedSnapshot> {
    let quakes = client.recent_earthquakes(limit).await?;
    Ok(snapshot_from_quakes(&quakes))
}

fn quake_fields(quake: &JmaQuake) -> RawFields {
    let mut fields = RawFields::new();
    fields.insert("source".into(), Value::from(P2PQUAKE_SOURCE));

    let detail = quake.earthquake.as_ref();
    let time = detail
        .and_then(|d| d.time.clone())
        .or_else(|| quake.time.clone());
    if let Some(time) = time {
        fields.insert("time".into(), Value::from(time));
    }

    if let Some(hypo) = detail.and_then(|d| d.hypocenter.as_ref()) {
        if let Some(magnitude) = hypo.known_magnitude() {
            fields.insert("magnitude".into(), Value::from(magnitude));
        }
        if let Some(name) = hypo.known_name() {
            fields.insert("location".into(), Value::from(name));
        }
        if let Some(depth) = hypo.known_depth_km() {
            fields.insert("depth".into(), Value::from(format!("{depth}km")));
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use disaster_common::IngestConfig;

    use crate::pipeline::normalizer::{normalize, NormalizedReport};

    fn quakes(raw: &str) -> Vec<JmaQuake> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn known_hypocenter_becomes_full_record() {
        let snap = snapshot_from_quakes(&quakes(
            r#"[{"id":"a","code":551,"time":"2024/03/01 10:01:30.120",
                 "earthquake":{"time":"2024/03/01 10:00:00",
                   "hypocenter":{"name":"東京湾","depth":10,"magnitude":5.2}}}]"#,
        ));

        assert_eq!(snap.earthquakes.len(), 1);
        assert!(snap.volcanoes.is_empty());
        assert_eq!(snap.last_updated.as_deref(), Some("2024/03/01 10:01:30.120"));

        let eq = &snap.earthquakes[0];
        assert_eq!(eq["magnitude"], Value::from(5.2));
        assert_eq!(eq["location"], Value::from("東京湾"));
        assert_eq!(eq["depth"], Value::from("10km"));
        assert_eq!(eq["time"], Value::from("2024/03/01 10:00:00"));
        assert_eq!(eq["source"], Value::from("P2PQuake"));
    }

    #[test]
    fn unknown_sentinels_are_omitted() {
        let snap = snapshot_from_quakes(&quakes(
            r#"[{"id":"b","code":551,"time":"2024/03/01 11:00:02.000",
                 "earthquake":{"time":"2024/03/01 10:59:00",
                   "hypocenter":{"name":"","depth":-1,"magnitude":-1}}}]"#,
        ));

        let eq = &snap.earthquakes[0];
        assert!(!eq.contains_key("magnitude"));
        assert!(!eq.contains_key("location"));
        assert!(!eq.contains_key("depth"));
        assert_eq!(eq["time"], Value::from("2024/03/01 10:59:00"));
    }

    #[test]
    fn receipt_time_used_when_occurrence_time_missing() {
        let snap = snapshot_from_quakes(&quakes(
            r#"[{"id":"c","code":551,"time":"2024/03/01 12:00:00.000"}]"#,
        ));
        assert_eq!(
            snap.earthquakes[0]["time"],
            Value::from("2024/03/01 12:00:00.000")
        );
    }

    #[test]
    fn receipt_time_with_milliseconds_normalizes_without_fallback() {
        let snap = snapshot_from_quakes(&quakes(
            r#"[{"id":"d","code":551,"time":"2024/03/01 12:00:00.000",
                 "earthquake":{"hypocenter":{"name":"千葉県北西部","depth":40,"magnitude":4.0}}}]"#,
        ));
        let records = snap.earthquake_records();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let report = normalize(&records[0], &IngestConfig::default(), now).unwrap();
        let NormalizedReport::Earthquake(eq) = report else {
            panic!("expected an earthquake, got {report:?}");
        };
        assert!(!eq.occurred_at.fallback);
        // 12:00 JST
        assert_eq!(eq.occurred_at.at, Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap());
        assert_eq!(eq.magnitude, 4.0);
        assert_eq!(eq.location, "千葉県北西部");
    }
}
