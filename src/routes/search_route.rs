use actix_web::{
    error,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    post, web, HttpResponse,
};
use serde::Deserialize;

use crate::{
    domain::{
        history::{SearchHistory, SearchOrigin},
        profile::SourceBackend,
        search_filters::SearchFilters,
    },
    error::SearchError,
    services::{
        exporter,
        search_pipeline::{SearchOutcome, SearchPipeline},
    },
};

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(flatten)]
    filters: SearchFilters,
    #[serde(default)]
    backend: SourceBackend,
}

async fn run_search(
    pipeline: &SearchPipeline,
    history: &SearchHistory,
    request: &SearchRequest,
) -> Result<SearchOutcome, SearchError> {
    let outcome = pipeline
        .search(&request.filters, request.backend)
        .await
        .map_err(|e| {
            log::error!("Search on {} failed: {}", request.backend, e);
            e
        })?;

    history.append(outcome.to_history_record(SearchOrigin::Http));
    Ok(outcome)
}

#[post("/search")]
async fn search(
    pipeline: web::Data<SearchPipeline>,
    history: web::Data<SearchHistory>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, SearchError> {
    let outcome = run_search(&pipeline, &history, &body).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/search/export")]
async fn export(
    pipeline: web::Data<SearchPipeline>,
    history: web::Data<SearchHistory>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let outcome = run_search(&pipeline, &history, &body).await?;
    let csv = exporter::to_csv_bytes(&outcome.profiles).map_err(|e| {
        log::error!("Failed to write csv export: {}", e);
        error::ErrorInternalServerError("Export failed")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(exporter::export_file_name(
                chrono::Utc::now(),
            ))],
        })
        .body(csv))
}
