use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::PrimaryBackendSettings,
    domain::profile::{RawResultItem, SourceBackend},
    error::SearchError,
    services::page_fetcher::SearchBackend,
};

/// Google Custom Search JSON API. `start` is 1-based and `num` is capped at 10.
pub struct GoogleSearch {
    client: Client,
    url: String,
    api_key: String,
    engine_id: String,
    inter_page_delay: Duration,
}

#[derive(Serialize)]
struct GoogleQuery<'a> {
    key: &'a str,
    cx: &'a str,
    q: &'a str,
    start: u32,
    num: u32,
}

#[derive(Deserialize)]
struct GoogleResponse {
    // absent when the query has no results
    #[serde(default)]
    items: Vec<RawResultItem>,
}

impl GoogleSearch {
    pub fn new(client: Client, settings: &PrimaryBackendSettings) -> Self {
        GoogleSearch {
            client,
            url: settings.base_url.clone(),
            api_key: settings.api_key.trim().to_string(),
            engine_id: settings.engine_id.trim().to_string(),
            inter_page_delay: Duration::from_millis(settings.inter_page_delay_ms),
        }
    }

    fn parse_page(body: &str) -> Result<Vec<RawResultItem>, SearchError> {
        serde_json::from_str::<GoogleResponse>(body)
            .map(|response| response.items)
            .map_err(|e| SearchError::malformed(SourceBackend::Primary, e))
    }
}

impl fmt::Debug for GoogleSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSearch")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("engine_id", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl SearchBackend for GoogleSearch {
    fn source(&self) -> SourceBackend {
        SourceBackend::Primary
    }

    fn first_start(&self) -> u32 {
        1
    }

    fn inter_page_delay(&self) -> Duration {
        self.inter_page_delay
    }

    fn ensure_configured(&self) -> Result<(), SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::Configuration(
                "Google Custom Search api key is not set".to_string(),
            ));
        }
        if self.engine_id.is_empty() {
            return Err(SearchError::Configuration(
                "Google Custom Search engine id is not set".to_string(),
            ));
        }
        Ok(())
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
            .query(&GoogleQuery {
                key: &self.api_key,
                cx: &self.engine_id,
                q: query,
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
