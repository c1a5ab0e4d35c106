//! HTTP fetcher implementation
//!
//! This module handles all requests to the eCFR API, including:
//! - Building the HTTP client with a descriptive user agent
//! - Exponential backoff on HTTP 429
//! - Fixed-delay retry on other failures, sharing one attempt budget
//! - Short-circuiting on HTTP 404
//! - Decoding structured responses against an expected schema

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    /// The resource was retrieved
    Found(T),

    /// HTTP 404: the resource definitely does not exist
    NotFound,

    /// The attempt budget was spent on rate limits or transient failures;
    /// the resource may exist
    Exhausted,

    /// The response could not be decoded as the expected schema
    Malformed(String),
}

/// Retry and backoff parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts shared by the rate-limit and other-error paths
    pub max_attempts: u32,

    /// Rate-limit delay on attempt `k` is `backoff_base * 2^k` plus jitter
    pub backoff_base: Duration,

    /// Upper bound of the random jitter added to each rate-limit delay
    pub max_jitter: Duration,

    /// Fixed wait after a failure that is not a rate limit
    pub error_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
            error_delay: Duration::from_millis(config.error_retry_ms),
        }
    }

    /// Delay before retrying after a 429 on the given zero-based attempt
    ///
    /// `jitter` is a fraction in `[0, 1)` of `max_jitter`; values outside
    /// that range are clamped.
    pub fn rate_limit_delay(&self, attempt: u32, jitter: f64) -> Duration {
        let exponential = self.backoff_base.saturating_mul(2u32.saturating_pow(attempt));
        let jitter = self.max_jitter.mul_f64(jitter.clamp(0.0, 1.0));
        exponential.saturating_add(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `Name/Version` or
/// `Name/Version (+ContactURL)` when a contact URL is configured.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let agent = if user_agent.contact_url.is_empty() {
        format!("{}/{}", user_agent.crawler_name, user_agent.crawler_version)
    } else {
        format!(
            "{}/{} (+{})",
            user_agent.crawler_name, user_agent.crawler_version, user_agent.contact_url
        )
    };

    Client::builder()
        .user_agent(agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited client for the eCFR API
///
/// Stateless across calls: every fetch gets a fresh attempt budget.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: Url,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher that resolves endpoint paths against `base_url`
    pub fn new(client: Client, base_url: &str, policy: RetryPolicy) -> Result<Self, url::ParseError> {
        // Without a trailing slash `join` would replace the last path segment
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            client,
            base_url,
            policy,
        })
    }

    /// Creates a fetcher from the full configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;
        let policy = RetryPolicy::from_config(&config.crawler);
        Ok(Self::new(client, &config.api.base_url, policy)?)
    }

    /// Resolves an endpoint path against the base URL
    ///
    /// Query pairs are percent-encoded, so identifiers containing `&`, `#`
    /// or `+` reach the server intact.
    pub fn endpoint_url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(endpoint)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Fetches a text payload
    pub async fn fetch_text(&self, endpoint: &str) -> FetchOutcome<String> {
        self.fetch_text_with_query(endpoint, &[]).await
    }

    /// Fetches a text payload with query parameters, such as a part's full XML
    pub async fn fetch_text_with_query(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> FetchOutcome<String> {
        let url = match self.endpoint_url(endpoint, query) {
            Ok(url) => url,
            Err(e) => return FetchOutcome::Malformed(format!("invalid endpoint {}: {}", endpoint, e)),
        };

        let mut attempt = 0;
        while attempt < self.policy.max_attempts {
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let delay = self.policy.rate_limit_delay(attempt, rand::random::<f64>());
                        tracing::warn!(
                            "Rate limited on {}, waiting {}ms before retry",
                            endpoint,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if status == StatusCode::NOT_FOUND {
                        tracing::info!("Resource not found: {}", endpoint);
                        return FetchOutcome::NotFound;
                    }

                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => return FetchOutcome::Found(body),
                            Err(e) => {
                                tracing::warn!("Error reading body of {}: {}", endpoint, e)
                            }
                        }
                    } else {
                        tracing::warn!("Error fetching {}: HTTP {}", endpoint, status.as_u16());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error fetching {}: {}", endpoint, e);
                }
            }

            tokio::time::sleep(self.policy.error_delay).await;
            attempt += 1;
        }

        tracing::warn!(
            "Max retries ({}) exceeded for {}",
            self.policy.max_attempts,
            endpoint
        );
        FetchOutcome::Exhausted
    }

    /// Fetches a JSON payload and decodes it as `T`
    ///
    /// A body that does not decode yields `Malformed` without retrying.
    pub async fn fetch_json<T: DeserializeOwned>(&self, endpoint: &str) -> FetchOutcome<T> {
        match self.fetch_text(endpoint).await {
            FetchOutcome::Found(body) => match serde_json::from_str(&body) {
                Ok(value) => FetchOutcome::Found(value),
                Err(e) => {
                    tracing::warn!("Unexpected response shape from {}: {}", endpoint, e);
                    FetchOutcome::Malformed(e.to_string())
                }
            },
            FetchOutcome::NotFound => FetchOutcome::NotFound,
            FetchOutcome::Exhausted => FetchOutcome::Exhausted,
            FetchOutcome::Malformed(reason) => FetchOutcome::Malformed(reason),
        }
    }
}
