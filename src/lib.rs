//! Lexicrawl: a site crawler with a lemma-based search index
//!
//! This crate crawls a configured set of websites, reduces every page to
//! normalized word roots (lemmas), stores them in an inverted index and
//! answers ranked free-text queries with highlighted snippets.

pub mod config;
pub mod crawler;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Lexicrawl operations
#[derive(Debug, Error)]
pub enum LexiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Morphology error: {0}")]
    Morphology(#[from] MorphologyError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while loading a morphology dictionary
#[derive(Debug, Error)]
pub enum MorphologyError {
    #[error("Failed to read dictionary: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dictionary line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Result type alias for Lexicrawl operations
pub type Result<T> = std::result::Result<T, LexiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::IndexingService;
pub use search::{SearchEngine, SearchRequest, SearchResponse};
pub use state::SiteStatus;
