//! Live/historical classification.
//!
//! Pure decision functions: given a normalized report and the configured
//! thresholds, build the live and/or historical candidates it qualifies for.
//! The two checks are independent, so a report may yield both, either, or
//! neither.

use chrono::{DateTime, Utc};

use disaster_common::{DisasterType, HistoricalDisasterEvent, IngestConfig, LiveDisasterEvent};

use super::normalizer::{EarthquakeReport, NormalizedReport, VolcanoReport};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub live: Option<LiveDisasterEvent>,
    pub history: Option<HistoricalDisasterEvent>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.live.is_none() && self.history.is_none()
    }
}

pub fn classify(
    report: &NormalizedReport,
    config: &IngestConfig,
    now: DateTime<Utc>,
) -> Classification {
    let disaster_type = report.kind().disaster_type();
    match report {
        NormalizedReport::Earthquake(eq) => classify_earthquake(eq, disaster_type, config, now),
        NormalizedReport::Volcano(v) => classify_volcano(v, disaster_type, config, now),
    }
}

fn classify_earthquake(
    eq: &EarthquakeReport,
    disaster_type: DisasterType,
    config: &IngestConfig,
    now: DateTime<Utc>,
) -> Classification {
    let title = earthquake_title(eq.magnitude);

    let live = (eq.magnitude >= config.earthquake_live_min_magnitude).then(|| LiveDisasterEvent {
        id: None,
        disaster_type,
        title: title.clone(),
        location: eq.location.clone(),
        magnitude: Some(eq.magnitude),
        depth: eq.depth.clone(),
        alert_level: None,
        status: None,
        started_at: eq.occurred_at.at,
        expected_end: None,
        source: eq.source.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    });

    let history =
        (eq.magnitude >= config.earthquake_history_min_magnitude).then(|| HistoricalDisasterEvent {
            id: None,
            disaster_type,
            title: title.clone(),
            location: eq.location.clone(),
            magnitude: Some(eq.magnitude),
            depth: eq.depth.clone(),
            alert_level: None,
            description: earthquake_description(eq),
            occurred_at: eq.occurred_at.at,
            time_estimated: eq.occurred_at.fallback,
            ended_at: None,
            source: eq.source.clone(),
            created_at: now,
        });

    Classification { live, history }
}

fn classify_volcano(
    v: &VolcanoReport,
    disaster_type: DisasterType,
    config: &IngestConfig,
    now: DateTime<Utc>,
) -> Classification {
    let title = volcano_title(&v.name);
    let alert = v.alert_level.to_string();

    let live = (v.alert_level >= config.volcano_live_min_alert).then(|| LiveDisasterEvent {
        id: None,
        disaster_type,
        title: title.clone(),
        location: v.name.clone(),
        magnitude: None,
        depth: None,
        alert_level: Some(alert.clone()),
        status: v.status.clone(),
        started_at: v.observed_at.at,
        expected_end: None,
        source: v.source.clone(),
        is_active: true,
        created_at: now,
        updated_at: now,
    });

    let history = (v.alert_level >= config.volcano_history_min_alert).then(|| {
        HistoricalDisasterEvent {
            id: None,
            disaster_type,
            title: title.clone(),
            location: v.name.clone(),
            magnitude: None,
            depth: None,
            alert_level: Some(alert.clone()),
            description: volcano_description(v),
            occurred_at: v.observed_at.at,
            time_estimated: v.observed_at.fallback,
            ended_at: None,
            source: v.source.clone(),
            created_at: now,
        }
    });

    Classification { live, history }
}

// ---------------------------------------------------------------------------
// Text synthesis
// ---------------------------------------------------------------------------

/// The magnitude is rendered as reported, without rounding.
pub fn earthquake_title(magnitude: f64) -> String {
    format!("{magnitude} magnitude earthquake")
}

pub fn volcano_title(name: &str) -> String {
    format!("{name} volcanic alert")
}

fn earthquake_description(eq: &EarthquakeReport) -> String {
    match &eq.depth {
        Some(depth) => format!(
            "A magnitude {} earthquake occurred at {} (depth {}).",
            eq.magnitude, eq.location, depth
        ),
        None => format!(
            "A magnitude {} earthquake occurred at {}.",
            eq.magnitude, eq.location
        ),
    }
}

fn volcano_description(v: &VolcanoReport) -> String {
    format!("Alert level {} issued for {} volcano.", v.alert_level, v.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalizer::ParsedTimestamp;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()
    }

    fn occurred() -> ParsedTimestamp {
        ParsedTimestamp {
            at: Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap(),
            fallback: false,
        }
    }

    fn quake(magnitude: f64, depth: Option<&str>) -> NormalizedReport {
        NormalizedReport::Earthquake(EarthquakeReport {
            magnitude,
            location: "Tokyo Bay".into(),
            depth: depth.map(String::from),
            source: "JMA".into(),
            occurred_at: occurred(),
        })
    }

    fn volcano(level: i32) -> NormalizedReport {
        NormalizedReport::Volcano(VolcanoReport {
            name: "Sakurajima".into(),
            alert_level: level,
            status: Some("入山規制".into()),
            source: "JMA".into(),
            observed_at: occurred(),
        })
    }

    #[test]
    fn default_thresholds_accept_every_earthquake() {
        let config = IngestConfig::default();
        let c = classify(&quake(0.4, None), &config, now());
        assert!(c.live.is_some());
        assert!(c.history.is_some());
    }

    #[test]
    fn earthquake_thresholds_are_independent() {
        let config = IngestConfig {
            earthquake_live_min_magnitude: 3.0,
            earthquake_history_min_magnitude: 4.0,
            ..IngestConfig::default()
        };

        let small = classify(&quake(2.9, None), &config, now());
        assert!(small.is_empty());

        let mid = classify(&quake(3.5, None), &config, now());
        assert!(mid.live.is_some());
        assert!(mid.history.is_none());

        let large = classify(&quake(4.0, None), &config, now());
        assert!(large.live.is_some());
        assert!(large.history.is_some());

        let inverted = IngestConfig {
            earthquake_live_min_magnitude: 6.0,
            earthquake_history_min_magnitude: 1.0,
            ..IngestConfig::default()
        };
        let history_only = classify(&quake(5.0, None), &inverted, now());
        assert!(history_only.live.is_none());
        assert!(history_only.history.is_some());
    }

    #[test]
    fn earthquake_candidates_carry_report_fields() {
        let config = IngestConfig::default();
        let c = classify(&quake(5.2, Some("10km")), &config, now());

        let live = c.live.unwrap();
        assert_eq!(live.title, "5.2 magnitude earthquake");
        assert_eq!(live.disaster_type, DisasterType::Earthquake);
        assert_eq!(live.magnitude, Some(5.2));
        assert_eq!(live.depth.as_deref(), Some("10km"));
        assert_eq!(live.started_at, occurred().at);
        assert_eq!(live.updated_at, now());
        assert!(live.is_active);
        assert!(live.id.is_none());

        let history = c.history.unwrap();
        assert_eq!(
            history.description,
            "A magnitude 5.2 earthquake occurred at Tokyo Bay (depth 10km)."
        );
        assert_eq!(history.occurred_at, occurred().at);
    }

    #[test]
    fn magnitude_is_not_rounded() {
        assert_eq!(earthquake_title(5.25), "5.25 magnitude earthquake");
        assert_eq!(earthquake_title(5.0), "5 magnitude earthquake");

        let c = classify(&quake(5.25, None), &IngestConfig::default(), now());
        assert_eq!(c.live.unwrap().title, "5.25 magnitude earthquake");
        assert_eq!(
            c.history.unwrap().description,
            "A magnitude 5.25 earthquake occurred at Tokyo Bay."
        );
    }

    #[test]
    fn description_omits_unknown_depth() {
        let c = classify(&quake(4.4, None), &IngestConfig::default(), now());
        assert_eq!(
            c.history.unwrap().description,
            "A magnitude 4.4 earthquake occurred at Tokyo Bay."
        );
    }

    #[test]
    fn volcano_levels_follow_default_thresholds() {
        let config = IngestConfig::default();

        assert!(classify(&volcano(1), &config, now()).is_empty());

        let level2 = classify(&volcano(2), &config, now());
        assert!(level2.live.is_some());
        assert!(level2.history.is_none());

        let level3 = classify(&volcano(3), &config, now());
        let live = level3.live.unwrap();
        assert_eq!(live.title, "Sakurajima volcanic alert");
        assert_eq!(live.alert_level.as_deref(), Some("3"));
        assert_eq!(live.status.as_deref(), Some("入山規制"));
        assert_eq!(live.location, "Sakurajima");
        assert_eq!(
            level3.history.unwrap().description,
            "Alert level 3 issued for Sakurajima volcano."
        );
    }
}
