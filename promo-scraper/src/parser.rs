use crate::types::{FeedItem, Result, ScraperError};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

pub struct FeedParser;

impl FeedParser {
    /// Parse RSS/Atom content into feed items, keeping feed order.
    ///
    /// Entries without a link or without any timestamp are dropped, as are
    /// repeated links.
    pub fn parse_feed(content: &str) -> Result<Vec<FeedItem>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| ScraperError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut seen_links = HashSet::new();
        let mut items = Vec::new();

        for entry in feed.entries {
            let Some(link) = entry.links.first().map(|l| l.href.trim().to_string()) else {
                debug!("Skipping entry without link: {}", entry.id);
                continue;
            };
            if link.is_empty() {
                continue;
            }

            let Some(published) = entry.published.or(entry.updated) else {
                debug!("Skipping entry without date: {}", link);
                continue;
            };

            if !seen_links.insert(link.clone()) {
                debug!("Skipping duplicate entry: {}", link);
                continue;
            }

            let feed_title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty());

            items.push(FeedItem {
                link,
                feed_title,
                published: published.with_timezone(&Utc),
            });
        }

        info!("Parsed feed with {} entries", items.len());
        Ok(items)
    }
}

/// Keep the items whose publish time falls on `date` in `tz`, in order.
pub fn filter_published_on(items: Vec<FeedItem>, date: NaiveDate, tz: &Tz) -> Vec<FeedItem> {
    items
        .into_iter()
        .filter(|item| item.published.with_timezone(tz).date_naive() == date)
        .collect()
}
