use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    domain::{profile::RawResultItem, profile::SourceBackend, search_filters::FetchMode},
    error::SearchError,
};

/// A search API that serves result pages for a boolean query.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn source(&self) -> SourceBackend;

    /// Most results a single request may ask for.
    fn page_size(&self) -> u32 {
        10
    }

    /// Hard limit on how deep the backend lets you page.
    fn result_ceiling(&self) -> u32 {
        100
    }

    /// Value of the `start` cursor for the first result (0- or 1-based).
    fn first_start(&self) -> u32;

    fn inter_page_delay(&self) -> Duration;

    /// Fails when a credential is missing. Called before any request.
    fn ensure_configured(&self) -> Result<(), SearchError>;

    async fn fetch_page(
        &self,
        query: &str,
        start: u32,
        num: u32,
    ) -> Result<Vec<RawResultItem>, SearchError>;
}

pub struct PageFetcher<'a> {
    backend: &'a dyn SearchBackend,
    deadline: Option<Instant>,
}

impl<'a> PageFetcher<'a> {
    pub fn new(backend: &'a dyn SearchBackend) -> Self {
        PageFetcher {
            backend,
            deadline: None,
        }
    }

    /// Past the deadline no further pages are requested and an in-flight
    /// request is abandoned.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn fetch(
        &self,
        query: &str,
        mode: FetchMode,
    ) -> Result<Vec<RawResultItem>, SearchError> {
        self.backend.ensure_configured()?;

        match mode {
            FetchMode::Bounded { count } => self.fetch_bounded(query, count).await,
            FetchMode::Exhaustive => Ok(self.fetch_exhaustive(query).await),
        }
    }

    async fn fetch_bounded(
        &self,
        query: &str,
        count: u32,
    ) -> Result<Vec<RawResultItem>, SearchError> {
        let num = count.clamp(1, self.backend.page_size());
        let mut items = self
            .fetch_one(query, self.backend.first_start(), num)
            .await?;
        items.truncate(num as usize);

        log::info!(
            "Fetched {} items from {} in a single page",
            items.len(),
            self.backend.source()
        );
        Ok(items)
    }

    /// Never fails: a page error ends pagination and keeps what was gathered.
    async fn fetch_exhaustive(&self, query: &str) -> Vec<RawResultItem> {
        let source = self.backend.source();
        let page_size = self.backend.page_size();
        let ceiling = self.backend.result_ceiling();
        let first_start = self.backend.first_start();
        let delay = self.backend.inter_page_delay();

        let mut items: Vec<RawResultItem> = vec![];
        let mut start = first_start;
        let mut pages_fetched = 0;

        loop {
            if (start - first_start) + page_size > ceiling {
                log::info!("Reached the {} result ceiling of {}", ceiling, source);
                break;
            }

            if pages_fetched > 0 {
                if self.past_deadline(delay) {
                    log::warn!(
                        "Search deadline reached on {} after {} pages",
                        source,
                        pages_fetched
                    );
                    break;
                }
                tokio::time::sleep(delay).await;
            }

            let page = match self.fetch_one(query, start, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    log::warn!(
                        "Stopping pagination on {} at start={}: {}",
                        source,
                        start,
                        e
                    );
                    break;
                }
            };
            pages_fetched += 1;

            let page_len = page.len();
            items.extend(page);
            log::info!(
                "Page {} from {} had {} items, {} so far",
                pages_fetched,
                source,
                page_len,
                items.len()
            );

            if page_len < page_size as usize {
                break;
            }
            start += page_size;
        }

        items
    }

    async fn fetch_one(
        &self,
        query: &str,
        start: u32,
        num: u32,
    ) -> Result<Vec<RawResultItem>, SearchError> {
        let request = self.backend.fetch_page(query, start, num);
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, request)
                .await
                .map_err(|_| SearchError::fetch(self.backend.source(), "search deadline exceeded"))?,
            None => request.await,
        }
    }

    fn past_deadline(&self, wait: Duration) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() + wait >= deadline,
            None => false,
        }
    }
}
