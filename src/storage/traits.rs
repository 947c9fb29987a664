//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::SiteStatus;
use crate::storage::{IndexRow, LemmaRecord, PageRecord, PendingLemma, PendingPage, SiteRecord};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Site not found: {0}")]
    SiteNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Scoped read queries take `site_id: Option<i64>`; `None` means every site.
pub trait Storage {
    // ===== Site Management =====

    /// Inserts a site row and returns its ID
    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    /// Sets a site's status, refreshing its status time
    ///
    /// `last_error` replaces the stored error; `None` clears it.
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Moves every site still `Indexing` to `Failed` with the given message
    ///
    /// # Returns
    ///
    /// The number of sites updated
    fn fail_indexing_sites(&mut self, message: &str) -> StorageResult<usize>;

    /// Moves every site that is not `Failed` to `Indexed`
    fn mark_unfailed_sites_indexed(&mut self) -> StorageResult<usize>;

    /// Gets a site by ID
    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    /// Gets the site registered under exactly this normalized URL
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Lists all sites ordered by ID
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Deletes all index entries, lemmas, pages and sites, in that order
    fn delete_all(&mut self) -> StorageResult<()>;

    // ===== Batch Inserts =====

    /// Inserts buffered pages, assigning their generated IDs
    fn insert_pages(
        &mut self,
        pages: &mut [PendingPage],
        batch_size: usize,
        cancel: &AtomicBool,
    ) -> StorageResult<usize>;

    /// Inserts reconciled lemmas, assigning their generated IDs
    fn insert_lemmas(
        &mut self,
        lemmas: &mut [PendingLemma],
        batch_size: usize,
        cancel: &AtomicBool,
    ) -> StorageResult<usize>;

    /// Inserts resolved index entries
    fn insert_index_rows(
        &mut self,
        rows: &mut [IndexRow],
        batch_size: usize,
        cancel: &AtomicBool,
    ) -> StorageResult<usize>;

    // ===== Single Page =====

    /// Replaces one page's contribution to the index in a single transaction
    ///
    /// Any stored page at `(site_id, path)` is removed together with its
    /// index entries, and each lemma it referenced loses one unit of
    /// frequency (lemmas reaching zero are deleted). If `code` is below 400
    /// the fresh page is inserted, each lemma in `lemmas` gains one unit of
    /// frequency (or is created) and its index entry is written.
    ///
    /// # Returns
    ///
    /// The ID of the fresh page, if one was inserted
    fn reindex_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
        lemmas: &HashMap<String, u32>,
    ) -> StorageResult<Option<i64>>;

    // ===== Queries =====

    /// Counts stored pages
    fn count_pages(&self, site_id: Option<i64>) -> StorageResult<u64>;

    /// Counts stored lemmas
    fn count_lemmas(&self, site_id: Option<i64>) -> StorageResult<u64>;

    /// Sums the frequency of `lemma` over the sites in scope
    fn lemma_frequency(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<u64>;

    /// IDs of the lemma rows with this text
    fn lemma_ids(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<Vec<i64>>;

    /// Gets one lemma row
    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Distinct IDs of pages with an index entry for any of `lemma_ids`
    fn page_ids_for_lemmas(&self, lemma_ids: &[i64]) -> StorageResult<Vec<i64>>;

    /// Sums the ranks of a page's entries for any of `lemma_ids`
    fn rank_sum(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<f64>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Gets a page by its site-relative path
    fn get_page_by_path(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Counts the pages carrying an index entry for this lemma row
    fn count_pages_with_lemma(&self, lemma_id: i64) -> StorageResult<u64>;
}
