use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::domain::history::SearchHistory;

const DEFAULT_LIMIT: usize = 20;

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[get("/history")]
async fn history(history: web::Data<SearchHistory>, query: web::Query<HistoryQuery>) -> HttpResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    HttpResponse::Ok().json(history.recent(limit))
}
