pub mod config;
pub mod expiry;
pub mod extractor;
pub mod feed_reader;
pub mod fetcher;
pub mod parser;
pub mod runner;
pub mod store;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::Config;
pub use expiry::ExpiryParser;
pub use extractor::PageExtractor;
pub use feed_reader::RssFeedReader;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use runner::{RunOrchestrator, RunPhase};
pub use store::PgPromotionStore;
pub use traits::{ContentExtractor, FeedSource, PromotionStore};
pub use types::*;
