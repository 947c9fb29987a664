use crate::config::types::{
    Config, CrawlerConfig, SearchConfig, SiteEntry, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use reqwest::header::HeaderValue;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_search_config(&config.search)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages_open < 1 || config.max_concurrent_pages_open > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages_open must be between 1 and 100, got {}",
            config.max_concurrent_pages_open
        )));
    }

    if config.request_timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1000ms, got {}ms",
            config.request_timeout
        )));
    }

    Ok(())
}

/// Validates the request identification headers
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.referer.trim().is_empty() {
        return Err(ConfigError::Validation("referer cannot be empty".to_string()));
    }

    HeaderValue::from_str(&config.referer).map_err(|_| {
        ConfigError::Validation(format!(
            "referer is not a valid header value: '{}'",
            config.referer
        ))
    })?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    for (name, size) in [
        ("page_batch_size", config.page_batch_size),
        ("lemma_batch_size", config.lemma_batch_size),
        ("index_batch_size", config.index_batch_size),
    ] {
        if size < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, size
            )));
        }
    }

    Ok(())
}

/// Validates query-time settings
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if !(config.frequency_threshold > 0.0 && config.frequency_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "frequency_threshold must be in (0, 1], got {}",
            config.frequency_threshold
        )));
    }

    if config.default_limit < 1 {
        return Err(ConfigError::Validation(
            "default_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the configured site list
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "At least one site must be configured".to_string(),
        ));
    }

    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a name",
                site.url
            )));
        }

        if site.url.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a URL",
                site.name
            )));
        }

        let url = Url::parse(site.url.trim()).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' must use HTTP or HTTPS",
                site.url
            )));
        }
    }

    Ok(())
}
