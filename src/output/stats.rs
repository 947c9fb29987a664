//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! per-site indexing statistics from the storage layer.

use crate::state::SiteStatus;
use crate::storage::Storage;
use crate::LexiError;
use serde::Serialize;

/// Index statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatistics {
    pub total: TotalStatistics,
    pub detailed: Vec<DetailedStatisticsItem>,
}

/// Totals across all sites
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStatistics {
    pub sites: u64,
    pub pages: u64,
    pub lemmas: u64,
    /// True if a run is active or any site is still INDEXING
    pub is_indexing: bool,
}

/// Statistics for one site
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStatisticsItem {
    pub name: String,
    pub url: String,
    pub status: SiteStatus,
    pub status_time: String,
    /// Last error message, empty if none
    pub error: String,
    pub pages: u64,
    pub lemmas: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `is_indexing` - Whether the indexing service currently runs
///
/// # Returns
///
/// * `Ok(IndexStatistics)` - Successfully loaded statistics
/// * `Err(LexiError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    is_indexing: bool,
) -> Result<IndexStatistics, LexiError> {
    let sites = storage.list_sites()?;

    let mut detailed = Vec::with_capacity(sites.len());
    for site in &sites {
        detailed.push(DetailedStatisticsItem {
            name: site.name.clone(),
            url: site.url.clone(),
            status: site.status,
            status_time: site.status_time.clone(),
            error: site.last_error.clone().unwrap_or_default(),
            pages: storage.count_pages(Some(site.id))?,
            lemmas: storage.count_lemmas(Some(site.id))?,
        });
    }

    let any_site_indexing = sites.iter().any(|s| s.status == SiteStatus::Indexing);

    Ok(IndexStatistics {
        total: TotalStatistics {
            sites: sites.len() as u64,
            pages: storage.count_pages(None)?,
            lemmas: storage.count_lemmas(None)?,
            is_indexing: is_indexing || any_site_indexing,
        },
        detailed,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.total.sites);
    println!("  Pages: {}", stats.total.pages);
    println!("  Lemmas: {}", stats.total.lemmas);
    println!(
        "  Indexing: {}",
        if stats.total.is_indexing { "yes" } else { "no" }
    );
    println!();

    if stats.detailed.is_empty() {
        println!("No sites have been indexed yet.");
        return;
    }

    println!("Sites:");
    for site in &stats.detailed {
        println!("  {} ({})", site.name, site.url);
        println!("    Status: {} since {}", site.status, site.status_time);
        println!("    Pages: {}, Lemmas: {}", site.pages, site.lemmas);
        if !site.error.is_empty() {
            println!("    Error: {}", site.error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use std::collections::HashMap;

    #[test]
    fn test_statistics_per_site() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage
            .insert_site("https://a.com", "A", SiteStatus::Indexed)
            .unwrap();
        storage
            .insert_site("https://b.com", "B", SiteStatus::Failed)
            .unwrap();
        storage
            .update_site_status(2, SiteStatus::Failed, Some("Error in connection"))
            .unwrap();

        let lemmas = HashMap::from([("собака".to_string(), 2), ("кошка".to_string(), 1)]);
        storage
            .reindex_page(a, "/", 200, "<html></html>", &lemmas)
            .unwrap();

        let stats = load_statistics(&storage, false).unwrap();

        assert_eq!(stats.total.sites, 2);
        assert_eq!(stats.total.pages, 1);
        assert_eq!(stats.total.lemmas, 2);
        assert!(!stats.total.is_indexing);
        assert_eq!(stats.detailed[0].pages, 1);
        assert_eq!(stats.detailed[0].error, "");
        assert_eq!(stats.detailed[1].error, "Error in connection");
    }

    #[test]
    fn test_indexing_site_marks_total_indexing() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .insert_site("https://a.com", "A", SiteStatus::Indexing)
            .unwrap();

        let stats = load_statistics(&storage, false).unwrap();

        assert!(stats.total.is_indexing);
    }
}
