use crate::types::{FetchConfig, Result, ScraperError};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://passageirodeprimeira.com/feed/";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;
pub const DEFAULT_ITEM_DELAY_MS: u64 = 1_500;

/// Process-wide settings, built once in `main` and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub feed_url: String,
    pub timezone: Tz,
    pub item_delay: Duration,
    pub fetch: FetchConfig,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// `DATABASE_URL` is required. `FEED_URL`, `SCRAPER_TIMEZONE`,
    /// `SCRAPER_DELAY_MS`, `SCRAPER_USER_AGENT` and `SCRAPER_TIMEOUT_SECONDS`
    /// are optional.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ScraperError::Config("DATABASE_URL must be set".to_string()))?;

        let timezone = match env::var("SCRAPER_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|e| ScraperError::Config(format!("SCRAPER_TIMEZONE: {}", e)))?,
            Err(_) => DEFAULT_TIMEZONE,
        };

        let item_delay_ms = parse_var("SCRAPER_DELAY_MS", DEFAULT_ITEM_DELAY_MS)?;

        let mut fetch = FetchConfig::default();
        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            fetch.user_agent = user_agent;
        }
        fetch.timeout_seconds = parse_var("SCRAPER_TIMEOUT_SECONDS", fetch.timeout_seconds)?;

        Ok(Self {
            database_url,
            feed_url: env::var("FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string()),
            timezone,
            item_delay: Duration::from_millis(item_delay_ms),
            fetch,
        })
    }

    /// Connection string with the password replaced, for logging.
    pub fn redacted_database_url(&self) -> String {
        match url::Url::parse(&self.database_url) {
            Ok(mut parsed) if parsed.password().is_some() => {
                let _ = parsed.set_password(Some("***"));
                parsed.to_string()
            }
            Ok(parsed) => parsed.to_string(),
            Err(_) => "<unparseable connection string>".to_string(),
        }
    }
}

fn parse_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ScraperError::Config(format!("{} must be a whole number", name))),
        Err(_) => Ok(default),
    }
}
