use serde::{Deserialize, Serialize};

/// Main configuration structure for Lexicrawl
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub morphology: MorphologyConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Pause before every page request (milliseconds)
    #[serde(rename = "politeness-delay", default = "default_politeness_delay")]
    pub politeness_delay: u64,

    /// Whole-request timeout (milliseconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Maximum number of concurrent page fetches per site
    #[serde(rename = "max-concurrent-pages-open")]
    pub max_concurrent_pages_open: u32,

    /// How long a stopped crawl may take to wind down (seconds)
    #[serde(
        rename = "shutdown-grace-period",
        default = "default_shutdown_grace_period"
    )]
    pub shutdown_grace_period: u64,
}

/// Request identification headers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserAgentConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    pub referer: String,
}

/// Database and batching configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Buffered pages that trigger a flush while crawling
    #[serde(rename = "page-batch-size", default = "default_page_batch_size")]
    pub page_batch_size: usize,

    #[serde(rename = "lemma-batch-size", default = "default_row_batch_size")]
    pub lemma_batch_size: usize,

    #[serde(rename = "index-batch-size", default = "default_row_batch_size")]
    pub index_batch_size: usize,
}

/// Morphological analyzer configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MorphologyConfig {
    /// Tab-separated dictionary of surface form, normal form and tags
    #[serde(rename = "dictionary-path")]
    pub dictionary_path: Option<String>,
}

/// Query-time ranking configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Lemmas present on a larger share of pages than this are ignored
    #[serde(rename = "frequency-threshold", default = "default_frequency_threshold")]
    pub frequency_threshold: f64,

    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            default_limit: default_limit(),
        }
    }
}

/// A site to crawl
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteEntry {
    pub name: String,
    pub url: String,
}

fn default_politeness_delay() -> u64 {
    100
}

fn default_request_timeout() -> u64 {
    15_000
}

fn default_shutdown_grace_period() -> u64 {
    30
}

fn default_page_batch_size() -> usize {
    100
}

fn default_row_batch_size() -> usize {
    1000
}

fn default_frequency_threshold() -> f64 {
    0.8
}

fn default_limit() -> usize {
    20
}
