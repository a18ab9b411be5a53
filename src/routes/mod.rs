pub mod default_route;
pub mod history_route;
pub mod search_route;
