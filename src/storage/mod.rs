//! Storage module for persisting the search index
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site status bookkeeping
//! - Chunked, transactional batch inserts that hand generated IDs back
//! - Single-page re-indexing
//! - The read queries used by ranking and statistics

mod batch;
mod schema;
mod sqlite;
mod traits;

pub use batch::{batch_insert, BatchRecord};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use crate::LexiError;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Storage handle shared between the crawler, the pipeline and search
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Opens a storage database and wraps it for sharing
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> Result<SharedStorage, LexiError> {
    Ok(Arc::new(Mutex::new(SqliteStorage::new(path)?)))
}

/// A site row
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// A stored page
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// A stored lemma with its document frequency on one site
#[derive(Debug, Clone)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: u32,
}

/// Temporary identity of a buffered page, valid until it is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey(pub u64);

/// Temporary identity of a buffered lemma record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LemmaKey(pub u64);

/// A page waiting in the pipeline for its database ID
#[derive(Debug, Clone)]
pub struct PendingPage {
    pub key: PageKey,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
    pub id: Option<i64>,
}

/// A lemma record waiting in the pipeline for its database ID
#[derive(Debug, Clone)]
pub struct PendingLemma {
    pub key: LemmaKey,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: u32,
    pub id: Option<i64>,
}

/// An index entry that refers to its page and lemma by temporary key
#[derive(Debug, Clone, PartialEq)]
pub struct PendingIndexEntry {
    pub page_key: PageKey,
    pub lemma_key: LemmaKey,
    pub rank: f64,
}

/// An index entry whose page and lemma IDs are known
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: f64,
    pub id: Option<i64>,
}
