use actix_web::{get, HttpResponse, Responder};

#[get("/")]
async fn default() -> impl Responder {
    HttpResponse::Ok().body("Scout is up. POST /search to find profiles.")
}

#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().finish()
}
