pub mod conversation;
pub mod exporter;
pub mod google_search;
pub mod page_fetcher;
pub mod profile_extractor;
pub mod search_pipeline;
pub mod serp_api;
pub mod telegram_bot;
#[cfg(test)]
pub mod test_support;

pub use conversation::SessionStore;
pub use page_fetcher::{PageFetcher, SearchBackend};
pub use profile_extractor::ProfileExtractor;
pub use search_pipeline::{SearchOutcome, SearchPipeline};
pub use telegram_bot::TelegramBot;
