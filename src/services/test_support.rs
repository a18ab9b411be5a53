use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    configuration::{AlternateBackendSettings, PrimaryBackendSettings, SearchSettings},
    domain::profile::{RawResultItem, SourceBackend},
    error::SearchError,
    services::page_fetcher::SearchBackend,
};

pub enum PageScript {
    /// Item counts per page, in request order. Requests past the end get an empty page.
    Sizes(Vec<usize>),
    AlwaysFull,
    /// Full pages until the nth request (1-based), which fails.
    FailOn(usize),
    /// The given items as a single page, then empty pages.
    Items(Vec<RawResultItem>),
}

#[derive(Debug, Clone, Copy)]
pub struct RecordedCall {
    pub start: u32,
    pub num: u32,
    pub at: Instant,
}

pub struct ScriptedBackend {
    source: SourceBackend,
    first_start: u32,
    delay: Duration,
    configured: bool,
    script: PageScript,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new(first_start: u32, script: PageScript) -> Self {
        ScriptedBackend {
            source: SourceBackend::Primary,
            first_start,
            delay: Duration::ZERO,
            configured: true,
            script,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_source(mut self, source: SourceBackend) -> Self {
        self.source = source;
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn page(start: u32, len: usize) -> Vec<RawResultItem> {
        (0..len)
            .map(|i| RawResultItem {
                title: format!("Person {} {} - CTO at Acme", start, i),
                link: format!("https://www.linkedin.com/in/person-{}-{}", start, i),
                snippet: "CTO at Acme".to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    fn source(&self) -> SourceBackend {
        self.source
    }

    fn first_start(&self) -> u32 {
        self.first_start
    }

    fn inter_page_delay(&self) -> Duration {
        self.delay
    }

    fn ensure_configured(&self) -> Result<(), SearchError> {
        match self.configured {
            true => Ok(()),
            false => Err(SearchError::Configuration(
                "scripted backend has no api key".to_string(),
            )),
        }
    }

    async fn fetch_page(
        &self,
        _query: &str,
        start: u32,
        num: u32,
    ) -> Result<Vec<RawResultItem>, SearchError> {
        let request_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                start,
                num,
                at: Instant::now(),
            });
            calls.len()
        };

        match &self.script {
            PageScript::Sizes(sizes) => Ok(Self::page(
                start,
                sizes.get(request_number - 1).copied().unwrap_or(0),
            )),
            PageScript::AlwaysFull => Ok(Self::page(start, num as usize)),
            PageScript::FailOn(n) if *n == request_number => {
                Err(SearchError::fetch(self.source, "status 503 Service Unavailable"))
            }
            PageScript::FailOn(_) => Ok(Self::page(start, num as usize)),
            PageScript::Items(items) if request_number == 1 => Ok(items.clone()),
            PageScript::Items(_) => Ok(vec![]),
        }
    }
}

pub fn search_settings() -> SearchSettings {
    SearchSettings {
        timeout_secs: 30,
        history_capacity: 10,
        primary: PrimaryBackendSettings {
            base_url: "http://127.0.0.1:9/customsearch/v1".to_string(),
            api_key: "primary-key".to_string(),
            engine_id: "engine".to_string(),
            inter_page_delay_ms: 0,
        },
        alternate: AlternateBackendSettings {
            base_url: "http://127.0.0.1:9/search.json".to_string(),
            api_key: String::new(),
            inter_page_delay_ms: 0,
        },
    }
}

pub fn jane_doe() -> RawResultItem {
    RawResultItem {
        title: "Jane Doe - CTO at Acme".to_string(),
        link: "https://linkedin.com/in/janedoe".to_string(),
        snippet: "Jane Doe is the CTO at Acme Software, San Francisco area, over 100 characters of additional padding text here to cross the completeness threshold for scoring purposes now.".to_string(),
    }
}

/// Serves `items` as every Google Custom Search page from a local actix server
/// and returns settings pointing the primary backend at it. Must be called from
/// inside an actix runtime.
pub fn spawn_primary_stub(items: Vec<RawResultItem>) -> SearchSettings {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().expect("local address").port();
    let body = serde_json::json!({ "items": items });

    let server = actix_web::HttpServer::new(move || {
        let body = body.clone();
        actix_web::App::new().route(
            "/customsearch/v1",
            actix_web::web::get().to(move || {
                let body = body.clone();
                async move { actix_web::HttpResponse::Ok().json(body) }
            }),
        )
    })
    .workers(1)
    .listen(listener)
    .expect("listen")
    .run();
    actix_web::rt::spawn(server);

    let mut settings = search_settings();
    settings.primary.base_url = format!("http://127.0.0.1:{}/customsearch/v1", port);
    settings
}
