//! HTTP fetcher with bounded retry and polite pacing
//!
//! Every request goes through one code path: GET with a timeout, retry on
//! transport errors and non-2xx statuses, and a mandatory pause after every
//! request so the crawl's request rate stays bounded no matter how fetches
//! turn out.

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a single attempt (and ultimately a whole fetch) failed
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-2xx response
    #[error("HTTP status {0}")]
    Status(u16),

    /// Timeout, connection failure, or other transport-level error
    #[error("request error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outcome of one fetch, after retries
#[derive(Debug)]
pub enum FetchResult {
    /// A 2xx response arrived within the attempt budget
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// Response body
        body: String,
    },

    /// Every attempt failed; the URL is given up on
    Failed { attempts: u32, error: FetchError },
}

/// Builds an HTTP client with the configured timeout and user agent
///
/// The user agent is formatted `name/version (+contact-url; contact-email)`
/// so site operators can identify and reach the crawler's owner.
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format_user_agent(user_agent))
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the user agent string: `name/version (+contact-url; contact-email)`
pub fn format_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Performs all HTTP fetches for a crawl.
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    polite_delay: Duration,
}

impl Fetcher {
    pub fn new(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(crawler, user_agent)?,
            max_attempts: crawler.max_attempts.max(1),
            polite_delay: Duration::from_millis(crawler.polite_delay_ms),
        })
    }

    /// Fetches a URL, retrying up to the configured attempt budget.
    ///
    /// Retries on transport errors and on any non-2xx status. The polite
    /// delay runs after a successful fetch and between attempts; a URL whose
    /// budget is exhausted returns immediately. Each URL gets its own budget;
    /// there is no global retry limit.
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.try_get(url).await {
                Ok((final_url, body)) => {
                    tokio::time::sleep(self.polite_delay).await;
                    return FetchResult::Success { final_url, body };
                }
                Err(error) => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        error
                    );

                    if attempt >= self.max_attempts {
                        tracing::error!(
                            "Failed to GET {} after {} attempts",
                            url,
                            self.max_attempts
                        );
                        return FetchResult::Failed {
                            attempts: attempt,
                            error,
                        };
                    }
                }
            }

            tokio::time::sleep(self.polite_delay).await;
        }
    }

    /// One GET attempt: 2xx with a body, or a classified error.
    async fn try_get(&self, url: &Url) -> Result<(Url, String), FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let body = response.text().await?;

        Ok((final_url, body))
    }
}
