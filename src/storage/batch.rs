//! Chunked batch inserts
//!
//! A batch is written inside a single transaction, one prepared statement
//! per table. Generated row IDs are read back after every insert and handed
//! to the in-memory record, so callers can resolve references that were
//! buffered before the rows existed.

use crate::storage::traits::StorageResult;
use crate::storage::{IndexRow, PendingLemma, PendingPage};
use rusqlite::{params, Connection, Statement, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};

/// A buffered record that can be written by [`batch_insert`]
pub trait BatchRecord {
    /// Table name, used for progress logging
    const TABLE: &'static str;

    /// Single-row INSERT statement
    const INSERT_SQL: &'static str;

    /// Binds this record's columns and executes the statement
    fn execute(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;

    /// Stores the ID SQLite generated for this record
    fn set_generated_id(&mut self, id: i64);
}

impl BatchRecord for PendingPage {
    const TABLE: &'static str = "page";
    const INSERT_SQL: &'static str =
        "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)";

    fn execute(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.site_id, self.path, self.code, self.content])
    }

    fn set_generated_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl BatchRecord for PendingLemma {
    const TABLE: &'static str = "lemma";
    const INSERT_SQL: &'static str =
        "INSERT INTO lemma (site_id, lemma, frequency) VALUES (?1, ?2, ?3)";

    fn execute(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.site_id, self.lemma, self.frequency])
    }

    fn set_generated_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl BatchRecord for IndexRow {
    const TABLE: &'static str = "search_index";
    const INSERT_SQL: &'static str =
        "INSERT INTO search_index (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)";

    fn execute(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.page_id, self.lemma_id, self.rank])
    }

    fn set_generated_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

/// Inserts `records` in chunks of `batch_size` within one transaction
///
/// The cancel flag is checked before every chunk; once it is set the rows
/// written so far are committed and the rest are skipped. Any database error
/// rolls back the whole call.
///
/// # Returns
///
/// The number of records inserted
pub fn batch_insert<T: BatchRecord>(
    conn: &mut Connection,
    records: &mut [T],
    batch_size: usize,
    cancel: &AtomicBool,
) -> StorageResult<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    match insert_chunks(&tx, records, batch_size, cancel) {
        Ok(inserted) => {
            tx.commit()?;
            Ok(inserted)
        }
        Err(e) => {
            tracing::error!(
                "Batch insert into {} failed, transaction rolled back: {}",
                T::TABLE,
                e
            );
            // dropping the transaction rolls it back
            Err(e.into())
        }
    }
}

fn insert_chunks<T: BatchRecord>(
    tx: &Transaction<'_>,
    records: &mut [T],
    batch_size: usize,
    cancel: &AtomicBool,
) -> rusqlite::Result<usize> {
    let total = records.len();
    let mut inserted = 0;
    let mut stmt = tx.prepare(T::INSERT_SQL)?;

    for chunk in records.chunks_mut(batch_size.max(1)) {
        if cancel.load(Ordering::SeqCst) {
            tracing::warn!(
                "Insert into {} cancelled after {} of {} rows",
                T::TABLE,
                inserted,
                total
            );
            break;
        }

        for record in chunk.iter_mut() {
            record.execute(&mut stmt)?;
            record.set_generated_id(tx.last_insert_rowid());
        }

        inserted += chunk.len();
        tracing::info!(
            "{} rows out of {} have been uploaded to {}",
            inserted,
            total,
            T::TABLE
        );
    }

    Ok(inserted)
}
