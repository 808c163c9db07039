use crate::types::{ExtractedRecord, FeedItem, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A feed that yields the candidate items for one run.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Items published on the current calendar day, in feed order
    async fn fetch_today(&self) -> Result<Vec<FeedItem>>;
}

/// Turns an item URL into a normalized record.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(
        &self,
        url: &str,
        feed_title: Option<&str>,
        published: Option<DateTime<Utc>>,
    ) -> Result<ExtractedRecord>;
}

/// Durable storage for promotions, keyed by URL.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// Delete rows whose `valid_until` is set and strictly before `now`.
    /// Returns the number of rows removed.
    async fn evict_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Insert or update the row for `record.url`.
    async fn upsert(&self, record: &ExtractedRecord, now: DateTime<Utc>) -> Result<()>;

    /// Release the underlying connection.
    async fn close(&self);
}
