use serde::Deserialize;

/// Information code for JMA earthquake reports (震度・震源情報).
pub const CODE_JMA_QUAKE: u32 = 551;

/// One entry from `GET /history?codes=551`.
#[derive(Debug, Clone, Deserialize)]
pub struct JmaQuake {
    pub code: u32,
    /// When P2PQuake received the report, `yyyy/MM/dd HH:mm:ss.SSS` JST.
    pub time: Option<String>,
    pub earthquake: Option<QuakeDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuakeDetail {
    /// Occurrence time, `yyyy/MM/dd HH:mm:ss` JST.
    pub time: Option<String>,
    pub hypocenter: Option<Hypocenter>,
}

/// Hypocenter fields. The API reports unknown numerics as -1 and an
/// unknown name as an empty string.
#[derive(Debug, Clone, Deserialize)]
pub struct Hypocenter {
    #[serde(default)]
    pub name: String,
    pub depth: Option<i32>,
    pub magnitude: Option<f64>,
}

impl Hypocenter {
    pub fn known_magnitude(&self) -> Option<f64> {
        self.magnitude.filter(|m| *m >= 0.0)
    }

    pub fn known_depth_km(&self) -> Option<i32> {
        self.depth.filter(|d| *d >= 0)
    }

    pub fn known_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
      {
        "id": "65e12a3f",
        "code": 551,
        "time": "2024/03/01 10:01:30.120",
        "issue": {"source": "気象庁", "type": "DetailScale"},
        "earthquake": {
          "time": "2024/03/01 10:00:00",
          "hypocenter": {"name": "東京湾", "latitude": 35.5, "longitude": 139.8, "depth": 10, "magnitude": 5.2},
          "maxScale": 40,
          "domesticTsunami": "None",
          "foreignTsunami": "Unknown"
        },
        "points": []
      },
      {
        "id": "65e12b00",
        "code": 551,
        "time": "2024/03/01 11:00:02.000",
        "earthquake": {
          "time": "2024/03/01 10:59:00",
          "hypocenter": {"name": "", "latitude": -200, "longitude": -200, "depth": -1, "magnitude": -1},
          "maxScale": 10
        }
      }
    ]"#;

    #[test]
    fn parses_history_payload() {
        let quakes: Vec<JmaQuake> = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(quakes.len(), 2);
        assert_eq!(quakes[0].code, CODE_JMA_QUAKE);

        let detail = quakes[0].earthquake.as_ref().unwrap();
        assert_eq!(detail.time.as_deref(), Some("2024/03/01 10:00:00"));
        let hypo = detail.hypocenter.as_ref().unwrap();
        assert_eq!(hypo.known_name(), Some("東京湾"));
        assert_eq!(hypo.known_magnitude(), Some(5.2));
        assert_eq!(hypo.known_depth_km(), Some(10));
    }

    #[test]
    fn unknown_sentinels_read_as_none() {
        let quakes: Vec<JmaQuake> = serde_json::from_str(SAMPLE).unwrap();
        let hypo = quakes[1]
            .earthquake
            .as_ref()
            .and_then(|e| e.hypocenter.as_ref())
            .unwrap();
        assert_eq!(hypo.known_name(), None);
        assert_eq!(hypo.known_magnitude(), None);
        assert_eq!(hypo.known_depth_km(), None);
    }
}
