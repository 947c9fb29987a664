use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 of the configuration text
pub fn compute_config_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Reads a configuration file once and returns the validated config along
/// with the hash of the exact bytes it was parsed from
///
/// ```no_run
/// use lexicrawl::config::load_config_with_hash;
/// use std::path::Path;
///
/// let (config, hash) = load_config_with_hash(Path::new("lexicrawl.toml")).unwrap();
/// println!("{} sites, config {}", config.sites.len(), &hash[..12]);
/// ```
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, compute_config_hash(&content)))
}
