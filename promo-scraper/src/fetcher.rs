use crate::types::{FetchConfig, Result, ScraperError};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Thin wrapper over a configured `reqwest::Client`.
///
/// Feed and page requests both go through here so user agent, timeouts,
/// redirect limits and the response size cap are applied uniformly.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// GET `url` and return the body as text. Non-2xx responses are errors.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(content_length as usize)?;
        }

        let content = response.text().await?;
        self.check_size(content.len())?;

        info!(
            "Fetched {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }

    fn check_size(&self, bytes: usize) -> Result<()> {
        let size_mb = bytes / (1024 * 1024);
        if size_mb > self.config.max_feed_size_mb {
            return Err(ScraperError::TooLarge { size_mb });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_text_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let body = fetcher
            .fetch_text(&format!("{}/page", server.url()))
            .await
            .unwrap();

        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let result = fetcher.fetch_text(&format!("{}/missing", server.url())).await;

        assert!(matches!(
            result,
            Err(ScraperError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_oversized_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/big")
            .with_status(200)
            .with_body("x".repeat(2 * 1024 * 1024))
            .create_async()
            .await;

        let config = FetchConfig {
            max_feed_size_mb: 1,
            ..FetchConfig::default()
        };
        let fetcher = Fetcher::new(config).unwrap();
        let result = fetcher.fetch_text(&format!("{}/big", server.url())).await;

        assert!(matches!(result, Err(ScraperError::TooLarge { .. })));
    }
}
