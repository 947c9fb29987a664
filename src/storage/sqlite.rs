//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::batch::batch_insert;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{IndexRow, LemmaRecord, PageRecord, PendingLemma, PendingPage, SiteRecord};
use crate::LexiError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(LexiError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, LexiError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, LexiError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

/// Builds `?,?,?` for an IN clause, numbering from `first`
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(",")
}

impl Storage for SqliteStorage {
    // ===== Site Management =====

    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO site (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, status.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE site SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, last_error, site_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SiteNotFound(site_id));
        }
        Ok(())
    }

    fn fail_indexing_sites(&mut self, message: &str) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE site SET status = ?1, status_time = ?2, last_error = ?3 WHERE status = ?4",
            params![
                SiteStatus::Failed.to_db_string(),
                now,
                message,
                SiteStatus::Indexing.to_db_string()
            ],
        )?;
        Ok(updated)
    }

    fn mark_unfailed_sites_indexed(&mut self) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE site SET status = ?1, status_time = ?2, last_error = NULL WHERE status != ?3",
            params![
                SiteStatus::Indexed.to_db_string(),
                now,
                SiteStatus::Failed.to_db_string()
            ],
        )?;
        Ok(updated)
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM site WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?
            .ok_or(StorageError::SiteNotFound(site_id))
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM site WHERE url = ?1 ORDER BY id LIMIT 1",
                    SITE_COLUMNS
                ),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM site ORDER BY id", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn delete_all(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM search_index", [])?;
        tx.execute("DELETE FROM lemma", [])?;
        tx.execute("DELETE FROM page", [])?;
        tx.execute("DELETE FROM site", [])?;
        tx.commit()?;
        Ok(())
    }

    // ===== Batch Inserts =====

    fn insert_pages(
        &mut self,
        pages: &mut [PendingPage],
        batch_size: usize,
        cancel: &AtomicBool,
    ) -> StorageResult<usize> {
        batch_insert(&mut self.conn, pages, batch_size, cancel)
    }

    fn insert_lemmas(
        &mut self,
        lemmas: &mut [PendingLemma],
        batch_size: usize,
        cancel: &AtomicBool,
    ) -> StorageResult<usize> {
        batch_insert(&mut self.conn, lemmas, batch_size, cancel)
    }

    fn insert_index_rows(
        &mut self,
        rows: &mut [IndexRow],
        batch_size: usize,
        cancel: &AtomicBool,
    ) -> StorageResult<usize> {
        batch_insert(&mut self.conn, rows, batch_size, cancel)
    }

    // ===== Single Page =====

    fn reindex_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
        lemmas: &HashMap<String, u32>,
    ) -> StorageResult<Option<i64>> {
        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM page WHERE site_id = ?1 AND path = ?2",
                params![site_id, path],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(old_page_id) = existing {
            let lemma_ids: Vec<i64> = {
                let mut stmt = tx.prepare("SELECT lemma_id FROM search_index WHERE page_id = ?1")?;
                let ids = stmt
                    .query_map(params![old_page_id], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            };

            tx.execute(
                "DELETE FROM search_index WHERE page_id = ?1",
                params![old_page_id],
            )?;
            for lemma_id in &lemma_ids {
                tx.execute(
                    "UPDATE lemma SET frequency = frequency - 1 WHERE id = ?1",
                    params![lemma_id],
                )?;
            }
            if !lemma_ids.is_empty() {
                tx.execute(
                    &format!(
                        "DELETE FROM lemma WHERE frequency <= 0 AND id IN ({})",
                        placeholders(1, lemma_ids.len())
                    ),
                    params_from_iter(lemma_ids.iter()),
                )?;
            }
            tx.execute("DELETE FROM page WHERE id = ?1", params![old_page_id])?;
            tracing::debug!(
                "Removed page {} ({} lemmas) before re-indexing",
                path,
                lemma_ids.len()
            );
        }

        if code >= 400 {
            tx.commit()?;
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            params![site_id, path, code, content],
        )?;
        let page_id = tx.last_insert_rowid();

        {
            let mut upsert = tx.prepare(
                "INSERT INTO lemma (site_id, lemma, frequency) VALUES (?1, ?2, 1)
                 ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1",
            )?;
            let mut select =
                tx.prepare("SELECT id FROM lemma WHERE site_id = ?1 AND lemma = ?2")?;
            let mut insert_index = tx.prepare(
                "INSERT INTO search_index (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)",
            )?;

            for (lemma, count) in lemmas {
                upsert.execute(params![site_id, lemma])?;
                let lemma_id: i64 = select.query_row(params![site_id, lemma], |row| row.get(0))?;
                insert_index.execute(params![page_id, lemma_id, f64::from(*count)])?;
            }
        }

        tx.commit()?;
        Ok(Some(page_id))
    }

    // ===== Queries =====

    fn count_pages(&self, site_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM page WHERE ?1 IS NULL OR site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_lemmas(&self, site_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemma WHERE ?1 IS NULL OR site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn lemma_frequency(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<u64> {
        let frequency: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(frequency), 0) FROM lemma
             WHERE lemma = ?1 AND (?2 IS NULL OR site_id = ?2)",
            params![lemma, site_id],
            |row| row.get(0),
        )?;
        Ok(frequency.max(0) as u64)
    }

    fn lemma_ids(&self, lemma: &str, site_id: Option<i64>) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM lemma WHERE lemma = ?1 AND (?2 IS NULL OR site_id = ?2) ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![lemma, site_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, site_id, lemma, frequency FROM lemma WHERE site_id = ?1 AND lemma = ?2",
                params![site_id, lemma],
                |row| {
                    Ok(LemmaRecord {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        lemma: row.get(2)?,
                        frequency: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn page_ids_for_lemmas(&self, lemma_ids: &[i64]) -> StorageResult<Vec<i64>> {
        if lemma_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT page_id FROM search_index WHERE lemma_id IN ({}) ORDER BY page_id",
            placeholders(1, lemma_ids.len())
        ))?;
        let ids = stmt
            .query_map(params_from_iter(lemma_ids.iter()), |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn rank_sum(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<f64> {
        if lemma_ids.is_empty() {
            return Ok(0.0);
        }
        let sql = format!(
            "SELECT COALESCE(SUM(rank), 0.0) FROM search_index
             WHERE page_id = ?1 AND lemma_id IN ({})",
            placeholders(2, lemma_ids.len())
        );
        let values: Vec<i64> = std::iter::once(page_id)
            .chain(lemma_ids.iter().copied())
            .collect();
        let sum: f64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(sum)
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM page WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))
    }

    fn get_page_by_path(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM page WHERE site_id = ?1 AND path = ?2",
                    PAGE_COLUMNS
                ),
                params![site_id, path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn count_pages_with_lemma(&self, lemma_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT page_id) FROM search_index WHERE lemma_id = ?1",
            params![lemma_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
