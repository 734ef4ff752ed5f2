use std::env;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{Duration, FixedOffset, Offset, Utc};
use tracing::info;

use crate::error::DisasterError;
use crate::matching::{MatchRules, DEFAULT_HISTORY_WINDOW_MINUTES};

/// Thresholds and rules that shape a single ingestion pass.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Minimum magnitude for an earthquake to become a live event.
    pub earthquake_live_min_magnitude: f64,
    /// Minimum magnitude for an earthquake to be recorded in history.
    pub earthquake_history_min_magnitude: f64,
    pub volcano_live_min_alert: i32,
    pub volcano_history_min_alert: i32,
    pub match_rules: MatchRules,
    /// Offset applied to feed timestamps that carry no zone.
    pub feed_offset: FixedOffset,
    /// Source name used when a record does not carry one.
    pub default_source: String,
    /// Upper bound on any single store call.
    pub store_timeout: StdDuration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            earthquake_live_min_magnitude: 0.0,
            earthquake_history_min_magnitude: 0.0,
            volcano_live_min_alert: 2,
            volcano_history_min_alert: 3,
            match_rules: MatchRules::default(),
            feed_offset: jst(),
            default_source: "JMA".to_string(),
            store_timeout: StdDuration::from_secs(10),
        }
    }
}

/// Japan Standard Time, the zone JMA feeds report in.
const JST_OFFSET_SECS: i32 = 9 * 3600;

fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Absent means the CLI runs against an
    /// in-memory store.
    pub database_url: Option<String>,
    pub p2pquake_base_url: String,
    pub poll_interval: StdDuration,
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, DisasterError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DisasterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = IngestConfig::default();

        let offset_hours: i32 = parse_or(&lookup, "FEED_UTC_OFFSET_HOURS", 9)?;
        let feed_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            DisasterError::Config(format!("FEED_UTC_OFFSET_HOURS out of range: {offset_hours}"))
        })?;

        let window_minutes: i64 = parse_or(
            &lookup,
            "HISTORY_DEDUP_WINDOW_MINUTES",
            DEFAULT_HISTORY_WINDOW_MINUTES,
        )?;
        if window_minutes < 0 {
            return Err(DisasterError::Config(
                "HISTORY_DEDUP_WINDOW_MINUTES must not be negative".to_string(),
            ));
        }

        let ingest = IngestConfig {
            earthquake_live_min_magnitude: parse_or(
                &lookup,
                "EARTHQUAKE_LIVE_MIN_MAGNITUDE",
                defaults.earthquake_live_min_magnitude,
            )?,
            earthquake_history_min_magnitude: parse_or(
                &lookup,
                "EARTHQUAKE_HISTORY_MIN_MAGNITUDE",
                defaults.earthquake_history_min_magnitude,
            )?,
            volcano_live_min_alert: parse_or(
                &lookup,
                "VOLCANO_LIVE_MIN_ALERT",
                defaults.volcano_live_min_alert,
            )?,
            volcano_history_min_alert: parse_or(
                &lookup,
                "VOLCANO_HISTORY_MIN_ALERT",
                defaults.volcano_history_min_alert,
            )?,
            match_rules: MatchRules::new(Duration::minutes(window_minutes)),
            feed_offset,
            default_source: lookup("FEED_DEFAULT_SOURCE").unwrap_or(defaults.default_source),
            store_timeout: StdDuration::from_secs(parse_or(&lookup, "STORE_TIMEOUT_SECS", 10)?),
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            p2pquake_base_url: lookup("P2PQUAKE_BASE_URL")
                .unwrap_or_else(|| "https://api.p2pquake.net/v2".to_string()),
            poll_interval: StdDuration::from_secs(parse_or(&lookup, "POLL_INTERVAL_SECS", 60)?),
            ingest,
        })
    }

    /// Log the effective configuration with credentials masked.
    pub fn log_redacted(&self) {
        info!(
            database = self
                .database_url
                .as_deref()
                .map(redact_url)
                .unwrap_or_else(|| "<in-memory>".to_string()),
            p2pquake = self.p2pquake_base_url.as_str(),
            poll_interval_secs = self.poll_interval.as_secs(),
            eq_live_min = self.ingest.earthquake_live_min_magnitude,
            eq_history_min = self.ingest.earthquake_history_min_magnitude,
            volcano_live_min = self.ingest.volcano_live_min_alert,
            volcano_history_min = self.ingest.volcano_history_min_alert,
            history_window_min = self.ingest.match_rules.history_window.num_minutes(),
            feed_offset = %self.ingest.feed_offset,
            store_timeout_secs = self.ingest.store_timeout.as_secs(),
            "Configuration loaded"
        );
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, DisasterError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| DisasterError::Config(format!("{key} has invalid value: {raw}"))),
        _ => Ok(default),
    }
}

/// Mask the password component of a connection URL.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let Some(at) = rest.find('@') else {
        return url.to_string();
    };
    match rest[..at].find(':') {
        Some(colon) => format!(
            "{}://{}:***{}",
            &url[..scheme_end],
            &rest[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.ingest.earthquake_live_min_magnitude, 0.0);
        assert_eq!(config.ingest.volcano_live_min_alert, 2);
        assert_eq!(config.ingest.volcano_history_min_alert, 3);
        assert_eq!(config.ingest.match_rules.history_window, Duration::minutes(60));
        assert_eq!(config.ingest.feed_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(config.ingest.default_source, "JMA");
        assert_eq!(config.poll_interval, StdDuration::from_secs(60));
    }

    #[test]
    fn thresholds_are_tunable() {
        let config = Config::from_lookup(lookup(&[
            ("EARTHQUAKE_LIVE_MIN_MAGNITUDE", "3.0"),
            ("EARTHQUAKE_HISTORY_MIN_MAGNITUDE", "4.0"),
            ("HISTORY_DEDUP_WINDOW_MINUTES", "15"),
            ("FEED_UTC_OFFSET_HOURS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.ingest.earthquake_live_min_magnitude, 3.0);
        assert_eq!(config.ingest.earthquake_history_min_magnitude, 4.0);
        assert_eq!(config.ingest.match_rules.history_window, Duration::minutes(15));
        assert_eq!(config.ingest.feed_offset.local_minus_utc(), 0);
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let err = Config::from_lookup(lookup(&[("VOLCANO_LIVE_MIN_ALERT", "two")])).unwrap_err();
        assert!(matches!(err, DisasterError::Config(_)));

        let err = Config::from_lookup(lookup(&[("FEED_UTC_OFFSET_HOURS", "99")])).unwrap_err();
        assert!(matches!(err, DisasterError::Config(_)));

        let err =
            Config::from_lookup(lookup(&[("HISTORY_DEDUP_WINDOW_MINUTES", "-5")])).unwrap_err();
        assert!(matches!(err, DisasterError::Config(_)));
    }

    #[test]
    fn empty_database_url_means_in_memory() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn redact_url_masks_password_only() {
        assert_eq!(
            redact_url("postgres://quake:s3cret@db:5432/disasters"),
            "postgres://quake:***@db:5432/disasters"
        );
        assert_eq!(redact_url("postgres://db/disasters"), "postgres://db/disasters");
    }
}
