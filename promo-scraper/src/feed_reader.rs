use crate::parser::{filter_published_on, FeedParser};
use crate::traits::FeedSource;
use crate::types::{FeedItem, Result};
use crate::Fetcher;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::info;

/// Reads a single RSS/Atom feed and selects the entries published today.
pub struct RssFeedReader {
    url: String,
    timezone: Tz,
    fetcher: Fetcher,
}

impl RssFeedReader {
    pub fn new(url: String, timezone: Tz, fetcher: Fetcher) -> Self {
        Self {
            url,
            timezone,
            fetcher,
        }
    }

    /// Items published on `date` (a calendar day in the reader's timezone).
    pub async fn fetch_on(&self, date: NaiveDate) -> Result<Vec<FeedItem>> {
        info!("Pulling RSS feed: {}", self.url);

        let content = self.fetcher.fetch_text(&self.url).await?;
        let items = FeedParser::parse_feed(&content)?;
        let found = items.len();

        let selected = filter_published_on(items, date, &self.timezone);
        info!(
            "{} of {} entries published on {} ({})",
            selected.len(),
            found,
            date,
            self.timezone.name()
        );
        Ok(selected)
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

#[async_trait]
impl FeedSource for RssFeedReader {
    fn source_name(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|parsed| parsed.domain().map(|d| format!("RSS Feed ({})", d)))
            .unwrap_or_else(|| "RSS Feed".to_string())
    }

    async fn fetch_today(&self) -> Result<Vec<FeedItem>> {
        self.fetch_on(self.today()).await
    }
}
