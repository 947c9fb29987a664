//! Configuration module for Lexicrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use lexicrawl::config::parse_config;
//!
//! let config = parse_config(&std::fs::read_to_string("lexicrawl.toml").unwrap()).unwrap();
//! println!("Indexing {} sites", config.sites.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, MorphologyConfig, SearchConfig, SiteEntry, StorageConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config_with_hash, parse_config};
pub use validation::validate;
