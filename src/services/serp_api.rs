use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::AlternateBackendSettings,
    domain::profile::{RawResultItem, SourceBackend},
    error::SearchError,
    services::page_fetcher::SearchBackend,
};

const ENGINE: &str = "google";
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

/// SerpAPI's Google engine. `start` is a 0-based result offset.
pub struct SerpApi {
    client: Client,
    url: String,
    api_key: String,
    inter_page_delay: Duration,
}

#[derive(Serialize)]
struct SerpQuery<'a> {
    engine: &'a str,
    q: &'a str,
    api_key: &'a str,
    start: u32,
    num: u32,
}

#[derive(Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<RawResultItem>,
    error: Option<String>,
}

impl SerpApi {
    pub fn new(client: Client, settings: &AlternateBackendSettings) -> Self {
        SerpApi {
            client,
            url: settings.base_url.clone(),
            api_key: settings.api_key.trim().to_string(),
            inter_page_delay: Duration::from_millis(settings.inter_page_delay_ms),
        }
    }

    fn parse_page(body: &str) -> Result<Vec<RawResultItem>, SearchError> {
        let response = serde_json::from_str::<SerpResponse>(body)
            .map_err(|e| SearchError::malformed(SourceBackend::Alternate, e))?;

        match response.error {
            Some(error) if error.contains(NO_RESULTS_MARKER) => Ok(vec![]),
            Some(error) => Err(SearchError::fetch(SourceBackend::Alternate, error)),
            None => Ok(response.organic_results),
        }
    }
}

impl fmt::Debug for SerpApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerpApi")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl SearchBackend for SerpApi {
    fn source(&self) -> SourceBackend {
        SourceBackend::Alternate
    }

    fn first_start(&self) -> u32 {
        0
    }

    fn inter_page_delay(&self) -> Duration {
        self.inter_page_delay
    }

    fn ensure_configured(&self) -> Result<(), SearchError> {
        match self.api_key.is_empty() {
            true => Err(SearchError::Configuration(
                "SerpAPI api key is not set".to_string(),
            )),
            false => Ok(()),
        }
    }

    async fn fetch_page(
        &self,
        query: &str,
        start: u32,
        num: u32,
    ) -> Result<Vec<RawResultItem>, SearchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&SerpQuery {
                engine: ENGINE,
                q: query,
                api_key: &self.api_key,
                start,
                num,
            })
            .send()
            .await
            .map_err(|e| SearchError::fetch(self.source(), e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::fetch(self.source(), format!("status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::fetch(self.source(), e.without_url()))?;

        Self::parse_page(&body)
    }
}
