use std::net::TcpListener;

use actix_web::{dev::Server, middleware::Logger, web::Data, App, HttpServer};

use crate::{
    domain::history::SearchHistory,
    routes::{default_route, history_route, search_route},
    services::SearchPipeline,
};

pub fn run(
    listener: TcpListener,
    pipeline: Data<SearchPipeline>,
    history: Data<SearchHistory>,
) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(default_route::default)
            .service(default_route::health_check)
            .service(search_route::search)
            .service(search_route::export)
            .service(history_route::history)
            .app_data(pipeline.clone())
            .app_data(history.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
