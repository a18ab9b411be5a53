pub mod history;
pub mod profile;
pub mod query_builder;
pub mod search_filters;
