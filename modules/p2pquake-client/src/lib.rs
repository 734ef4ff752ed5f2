pub mod error;
pub mod types;

pub use error::{P2pQuakeError, Result};
pub use types::{Hypocenter, JmaQuake, QuakeDetail, CODE_JMA_QUAKE};

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.p2pquake.net/v2";

/// The API rejects larger pages.
const MAX_LIMIT: u32 = 100;

pub struct P2pQuakeClient {
    client: reqwest::Client,
    base_url: String,
}

impl P2pQuakeClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the most recent JMA earthquake reports, newest first.
    pub async fn recent_earthquakes(&self, limit: u32) -> Result<Vec<JmaQuake>> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let url = format!(
            "{}/history?codes={}&limit={}",
            self.base_url, CODE_JMA_QUAKE, limit
        );
        tracing::debug!(url = url.as_str(), "Fetching P2PQuake history");

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(P2pQuakeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let quakes: Vec<JmaQuake> = serde_json::from_str(&body)?;
        tracing::info!(count = quakes.len(), "Fetched P2PQuake earthquake reports");

        Ok(quakes
            .into_iter()
            .filter(|q| q.code == CODE_JMA_QUAKE)
            .collect())
    }
}

impl Default for P2pQuakeClient {
    fn default() -> Self {
        Self::new()
    }
}
