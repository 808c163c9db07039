use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder stored when neither the page nor the feed provides a title.
pub const UNTITLED: &str = "Sem título";

/// Tag written to the `fonte` column for every record.
pub const SOURCE_TAG: &str = "passageirodeprimeira.com";

/// Maximum number of characters kept from a page body.
pub const MAX_BODY_CHARS: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub link: String,
    pub feed_title: Option<String>,
    pub published: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub title: String,
    pub body: String,
    pub url: String,
    pub valid_until: Option<DateTime<Utc>>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPromotion {
    pub id: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; PromoScraper/1.0)".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Persisted {
        title: String,
        valid_until: Option<DateTime<Utc>>,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub url: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub saved: usize,
    /// `None` when the eviction step failed.
    pub evicted: Option<u64>,
    pub items: Vec<ItemReport>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.total - self.saved
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Response size exceeds limit: {size_mb}MB")]
    TooLarge { size_mb: usize },

    #[error("Failed to extract {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScraperError {
    /// Wraps any failure that happened while handling a single page.
    pub fn extraction(url: &str, cause: impl std::fmt::Display) -> Self {
        Self::Extraction {
            url: url.to_string(),
            reason: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
