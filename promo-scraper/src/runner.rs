use crate::config::{DEFAULT_ITEM_DELAY_MS, DEFAULT_TIMEZONE};
use crate::traits::{ContentExtractor, FeedSource, PromotionStore};
use crate::types::{ItemOutcome, ItemReport, Result, RunSummary};
use chrono::Utc;
use chrono_tz::Tz;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Start,
    Evicting,
    Collecting,
    Extracting,
    Persisting,
    Done,
    Failed,
}

/// Drives one scrape run: evict, collect, then extract and persist each item.
///
/// The store is owned for the lifetime of the run and closed when it ends,
/// whether the run succeeds or aborts.
pub struct RunOrchestrator<F, E, S> {
    feed: F,
    extractor: E,
    store: S,
    item_delay: Duration,
    timezone: Tz,
    phase: RunPhase,
}

impl<F, E, S> RunOrchestrator<F, E, S>
where
    F: FeedSource,
    E: ContentExtractor,
    S: PromotionStore,
{
    pub fn new(feed: F, extractor: E, store: S) -> Self {
        Self {
            feed,
            extractor,
            store,
            item_delay: Duration::from_millis(DEFAULT_ITEM_DELAY_MS),
            timezone: DEFAULT_TIMEZONE,
            phase: RunPhase::Start,
        }
    }

    pub fn with_item_delay(mut self, item_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!("Run phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let result = self.run_inner().await;
        self.store.close().await;

        if result.is_err() {
            self.enter(RunPhase::Failed);
        }
        result
    }

    async fn run_inner(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        self.enter(RunPhase::Evicting);
        match self.store.evict_expired(Utc::now()).await {
            Ok(0) => {
                info!("No expired promotions to remove");
                summary.evicted = Some(0);
            }
            Ok(removed) => {
                info!("Removed {} expired promotions", removed);
                summary.evicted = Some(removed);
            }
            Err(e) => warn!("Failed to remove expired promotions: {}", e),
        }

        self.enter(RunPhase::Collecting);
        let items = self.feed.fetch_today().await.map_err(|e| {
            error!("Failed to read {}: {}", self.feed.source_name(), e);
            e
        })?;

        summary.total = items.len();
        if items.is_empty() {
            info!("No posts published today in {}", self.feed.source_name());
            self.enter(RunPhase::Done);
            return Ok(summary);
        }

        info!("{} post(s) published today", items.len());

        for (index, item) in items.iter().enumerate() {
            if index > 0 && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }

            info!("[{}/{}] {}", index + 1, summary.total, item.link);
            self.enter(RunPhase::Extracting);

            let outcome = match self
                .extractor
                .extract(&item.link, item.feed_title.as_deref(), Some(item.published))
                .await
            {
                Ok(record) => {
                    self.enter(RunPhase::Persisting);
                    match self.store.upsert(&record, Utc::now()).await {
                        Ok(()) => {
                            summary.saved += 1;
                            info!("   Saved: {}", record.title.chars().take(60).collect::<String>());
                            if let Some(valid_until) = record.valid_until {
                                info!(
                                    "   Expires: {}",
                                    valid_until.with_timezone(&self.timezone).format("%d/%m/%Y %H:%M")
                                );
                            }
                            ItemOutcome::Persisted {
                                title: record.title,
                                valid_until: record.valid_until,
                            }
                        }
                        Err(e) => {
                            error!("   Failed to save {}: {}", item.link, e);
                            ItemOutcome::Skipped {
                                reason: e.to_string(),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("   Skipped: {}", e);
                    ItemOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
            };

            summary.items.push(ItemReport {
                url: item.link.clone(),
                outcome,
            });
        }

        self.enter(RunPhase::Done);
        info!(
            "Finished: {}/{} posts saved ({} failed)",
            summary.saved,
            summary.total,
            summary.failed()
        );
        Ok(summary)
    }
}
