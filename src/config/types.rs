use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the census
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Upstream eCFR API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL all endpoint paths are joined onto
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Point-in-time date used by the structure and full-text endpoints
    #[serde(rename = "reference-date", default = "default_reference_date")]
    pub reference_date: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reference_date: default_reference_date(),
        }
    }
}

/// Which end of the reference-count ordering to select agencies from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgencyOrder {
    /// Fewest CFR references first
    #[default]
    Smallest,
    /// Most CFR references first
    Largest,
}

/// Crawl pacing and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of agencies to select when no count is given on the command line
    #[serde(rename = "agency-count", default = "default_agency_count")]
    pub agency_count: usize,

    #[serde(default)]
    pub order: AgencyOrder,

    /// Pause after every part (milliseconds)
    #[serde(rename = "pacing-ms", default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Attempt budget shared by rate-limit and other-error retries
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the exponential rate-limit backoff (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound of the random jitter added to each backoff (milliseconds)
    #[serde(rename = "max-jitter-ms", default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    /// Fixed wait after a non rate-limit failure (milliseconds)
    #[serde(rename = "error-retry-ms", default = "default_error_retry_ms")]
    pub error_retry_ms: u64,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            agency_count: default_agency_count(),
            order: AgencyOrder::default(),
            pacing_ms: default_pacing_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            error_retry_ms: default_error_retry_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// Optional URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: String::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding progress.json, status.html and the final report
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.ecfr.gov/api".to_string()
}

fn default_reference_date() -> String {
    "2023-01-01".to_string()
}

fn default_agency_count() -> usize {
    5
}

fn default_pacing_ms() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_error_retry_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_crawler_name() -> String {
    "ecfr-census".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/word-counts-small")
}
