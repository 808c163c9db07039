use anyhow::Context;
use clap::Parser;
use promo_scraper::{Config, Fetcher, PageExtractor, PgPromotionStore, RssFeedReader, RunOrchestrator};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "promo-scraper", about = "Collect today's promotions from the RSS feed")]
struct Cli {
    /// Override FEED_URL
    #[arg(long)]
    feed_url: Option<String>,

    /// Pause between item pages, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Create the promocoes table before running
    #[arg(long)]
    init_schema: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(feed_url) = cli.feed_url {
        config.feed_url = feed_url;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.item_delay = Duration::from_millis(delay_ms);
    }

    info!("Promo scraper starting: {}", config.feed_url);
    info!(
        "Local time: {}",
        chrono::Utc::now().with_timezone(&config.timezone).format("%d/%m/%Y %H:%M:%S")
    );

    let store = PgPromotionStore::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.redacted_database_url()))?;
    info!("Connected to database");

    if cli.init_schema {
        store.setup_schema().await.context("Failed to create schema")?;
    }

    let fetcher = Fetcher::new(config.fetch.clone()).context("Failed to create HTTP client")?;
    let feed = RssFeedReader::new(config.feed_url.clone(), config.timezone, fetcher.clone());
    let extractor = PageExtractor::new(fetcher, config.timezone);

    let mut orchestrator = RunOrchestrator::new(feed, extractor, store)
        .with_item_delay(config.item_delay)
        .with_timezone(config.timezone);

    let summary = orchestrator.run().await.context("Run aborted")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
