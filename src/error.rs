use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::domain::profile::SourceBackend;

const RETRY_LATER: &str = "Search is temporarily unavailable, please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A backend credential is missing. Raised before any request is sent.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{backend} fetch failed: {reason}")]
    FetchFailure {
        backend: SourceBackend,
        reason: String,
    },
    #[error("{backend} returned a malformed response: {reason}")]
    MalformedResponse {
        backend: SourceBackend,
        reason: String,
    },
}

impl SearchError {
    pub fn fetch(backend: SourceBackend, reason: impl ToString) -> Self {
        SearchError::FetchFailure {
            backend,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(backend: SourceBackend, reason: impl ToString) -> Self {
        SearchError::MalformedResponse {
            backend,
            reason: reason.to_string(),
        }
    }
}

impl ResponseError for SearchError {
    fn status_code(&self) -> StatusCode {
        match self {
            SearchError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SearchError::FetchFailure { .. } | SearchError::MalformedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": RETRY_LATER }))
    }
}
