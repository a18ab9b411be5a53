use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    configuration::SearchSettings,
    domain::{
        history::{SearchHistoryRecord, SearchOrigin},
        profile::{CandidateProfile, SourceBackend},
        query_builder::{build_query, search_context},
        search_filters::SearchFilters,
    },
    error::SearchError,
    services::{
        google_search::GoogleSearch,
        page_fetcher::{PageFetcher, SearchBackend},
        profile_extractor::ProfileExtractor,
        serp_api::SerpApi,
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub backend: SourceBackend,
    #[serde(skip)]
    pub filters: SearchFilters,
    pub raw_result_count: usize,
    pub result_count: usize,
    pub elapsed_ms: u64,
    pub profiles: Vec<CandidateProfile>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profile_urls(&self) -> Vec<String> {
        self.profiles
            .iter()
            .map(|p| p.profile_url.to_string())
            .collect()
    }

    pub fn to_history_record(&self, origin: SearchOrigin) -> SearchHistoryRecord {
        SearchHistoryRecord {
            id: Uuid::new_v4(),
            searched_at: Utc::now(),
            origin,
            backend: self.backend,
            query: self.query.clone(),
            filters: self.filters.clone(),
            result_count: self.result_count,
            elapsed_ms: self.elapsed_ms,
            profile_urls: self.profile_urls(),
        }
    }
}

/// Filters in, scored profiles out. Holds configuration only, so one instance
/// serves any number of concurrent searches.
pub struct SearchPipeline {
    client: Client,
    settings: SearchSettings,
}

impl SearchPipeline {
    pub fn new(settings: SearchSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(SearchPipeline { client, settings })
    }

    pub fn backend(&self, source: SourceBackend) -> Box<dyn SearchBackend> {
        match source {
            SourceBackend::Primary => Box::new(GoogleSearch::new(
                self.client.clone(),
                &self.settings.primary,
            )),
            SourceBackend::Alternate => Box::new(SerpApi::new(
                self.client.clone(),
                &self.settings.alternate,
            )),
        }
    }

    pub async fn search(
        &self,
        filters: &SearchFilters,
        source: SourceBackend,
    ) -> Result<SearchOutcome, SearchError> {
        let backend = self.backend(source);
        self.search_with(backend.as_ref(), filters).await
    }

    pub async fn search_with(
        &self,
        backend: &dyn SearchBackend,
        filters: &SearchFilters,
    ) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let query = build_query(filters);
        let context = search_context(filters);
        log::info!("Searching {} for: {}", backend.source(), query);

        let items = PageFetcher::new(backend)
            .with_deadline(started + self.settings.timeout())
            .fetch(&query, filters.mode)
            .await?;

        let profiles = ProfileExtractor::for_backend(backend.source()).extract(&items, &context);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        log::info!(
            "Search on {} found {} profiles from {} results in {}ms",
            backend.source(),
            profiles.len(),
            items.len(),
            elapsed_ms
        );

        Ok(SearchOutcome {
            query,
            backend: backend.source(),
            filters: filters.clone(),
            raw_result_count: items.len(),
            result_count: profiles.len(),
            elapsed_ms,
            profiles,
        })
    }
}
