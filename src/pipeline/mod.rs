//! Persistence pipeline
//!
//! Crawl tasks never write lemmas or index entries directly. They append
//! to the buffers here, referring to not-yet-inserted rows by temporary
//! keys ([`PageKey`], [`LemmaKey`]). Pages are flushed in batches while the
//! crawl runs; lemmas and entries wait until every site has finished, then
//! [`IndexPipeline::persist`] reconciles lemma frequencies, resolves keys to
//! database IDs and writes the rest.

mod reconcile;

pub use reconcile::{reconcile_lemmas, repoint_entries};

use crate::config::StorageConfig;
use crate::storage::{
    IndexRow, LemmaKey, PageKey, PendingIndexEntry, PendingLemma, PendingPage, SharedStorage,
    Storage, StorageResult,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Chunk sizes for the three batch inserts
#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub page_batch_size: usize,
    pub lemma_batch_size: usize,
    pub index_batch_size: usize,
}

impl From<&StorageConfig> for BatchSettings {
    fn from(config: &StorageConfig) -> Self {
        Self {
            page_batch_size: config.page_batch_size,
            lemma_batch_size: config.lemma_batch_size,
            index_batch_size: config.index_batch_size,
        }
    }
}

/// Row counts written by [`IndexPipeline::persist`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub pages: usize,
    pub lemmas: usize,
    pub index_entries: usize,
    /// Entries dropped because their page or lemma never got an ID
    pub unresolved: usize,
}

/// Concurrency-safe buffers for one indexing run
pub struct IndexPipeline {
    storage: SharedStorage,
    settings: BatchSettings,
    pages: Mutex<Vec<PendingPage>>,
    lemmas: Mutex<Vec<PendingLemma>>,
    entries: Mutex<Vec<PendingIndexEntry>>,
    page_ids: Mutex<HashMap<PageKey, i64>>,
    next_page_key: AtomicU64,
    next_lemma_key: AtomicU64,
    pages_buffered: AtomicU64,
}

impl IndexPipeline {
    pub fn new(storage: SharedStorage, settings: BatchSettings) -> Self {
        Self {
            storage,
            settings,
            pages: Mutex::new(Vec::new()),
            lemmas: Mutex::new(Vec::new()),
            entries: Mutex::new(Vec::new()),
            page_ids: Mutex::new(HashMap::new()),
            next_page_key: AtomicU64::new(0),
            next_lemma_key: AtomicU64::new(0),
            pages_buffered: AtomicU64::new(0),
        }
    }

    /// Buffers a fetched page and flushes the page buffer once it is full
    ///
    /// The page key is returned even if the flush fails; entries pointing
    /// at a page that never got an ID are dropped by [`persist`](Self::persist).
    pub fn buffer_page(
        &self,
        site_id: i64,
        path: &str,
        code: u16,
        content: String,
        cancel: &AtomicBool,
    ) -> (PageKey, StorageResult<usize>) {
        let key = PageKey(self.next_page_key.fetch_add(1, Ordering::SeqCst));
        let full_batch = {
            let mut pages = self.pages.lock();
            pages.push(PendingPage {
                key,
                site_id,
                path: path.to_string(),
                code,
                content,
                id: None,
            });
            if pages.len() >= self.settings.page_batch_size {
                Some(std::mem::take(&mut *pages))
            } else {
                None
            }
        };

        let count = self.pages_buffered.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("[{}] buffered page {}", count, path);

        let flushed = match full_batch {
            Some(batch) => self.write_pages(batch, cancel),
            None => Ok(0),
        };
        (key, flushed)
    }

    /// Buffers one lemma occurrence for a page; its frequency is settled later
    pub fn buffer_lemma(&self, site_id: i64, lemma: &str) -> LemmaKey {
        let key = LemmaKey(self.next_lemma_key.fetch_add(1, Ordering::SeqCst));
        self.lemmas.lock().push(PendingLemma {
            key,
            site_id,
            lemma: lemma.to_string(),
            frequency: 1,
            id: None,
        });
        key
    }

    pub fn buffer_index_entry(&self, page_key: PageKey, lemma_key: LemmaKey, rank: f64) {
        self.entries.lock().push(PendingIndexEntry {
            page_key,
            lemma_key,
            rank,
        });
    }

    /// Writes every buffered page
    pub fn flush_pages(&self, cancel: &AtomicBool) -> StorageResult<usize> {
        let batch = std::mem::take(&mut *self.pages.lock());
        self.write_pages(batch, cancel)
    }

    fn write_pages(&self, mut batch: Vec<PendingPage>, cancel: &AtomicBool) -> StorageResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let inserted = self.storage.lock().insert_pages(
            &mut batch,
            self.settings.page_batch_size,
            cancel,
        )?;

        let mut page_ids = self.page_ids.lock();
        for page in &batch {
            if let Some(id) = page.id {
                page_ids.insert(page.key, id);
            }
        }
        Ok(inserted)
    }

    /// Flushes pages, reconciles lemmas and writes lemmas and index entries
    ///
    /// Must only run after every crawl task that buffers into this pipeline
    /// has finished.
    pub fn persist(&self, cancel: &AtomicBool) -> StorageResult<PersistSummary> {
        let mut summary = PersistSummary {
            pages: self.flush_pages(cancel)?,
            ..PersistSummary::default()
        };

        let lemmas = std::mem::take(&mut *self.lemmas.lock());
        let mut entries = std::mem::take(&mut *self.entries.lock());

        let buffered = lemmas.len();
        let (mut lemmas, key_map) = reconcile_lemmas(lemmas);
        repoint_entries(&mut entries, &key_map);
        tracing::info!(
            "Reconciled {} buffered lemma records into {}",
            buffered,
            lemmas.len()
        );

        summary.lemmas = self.storage.lock().insert_lemmas(
            &mut lemmas,
            self.settings.lemma_batch_size,
            cancel,
        )?;

        let lemma_ids: HashMap<LemmaKey, i64> = lemmas
            .iter()
            .filter_map(|lemma| lemma.id.map(|id| (lemma.key, id)))
            .collect();

        let mut rows = {
            let page_ids = self.page_ids.lock();
            let mut rows = Vec::with_capacity(entries.len());
            for entry in &entries {
                match (page_ids.get(&entry.page_key), lemma_ids.get(&entry.lemma_key)) {
                    (Some(&page_id), Some(&lemma_id)) => rows.push(IndexRow {
                        page_id,
                        lemma_id,
                        rank: entry.rank,
                        id: None,
                    }),
                    _ => summary.unresolved += 1,
                }
            }
            rows
        };
        if summary.unresolved > 0 {
            tracing::warn!(
                "{} index entries refer to pages or lemmas that were not stored",
                summary.unresolved
            );
        }

        summary.index_entries = self.storage.lock().insert_index_rows(
            &mut rows,
            self.settings.index_batch_size,
            cancel,
        )?;

        Ok(summary)
    }

    /// Drops everything buffered; called at the start of each run
    pub fn clear(&self) {
        self.pages.lock().clear();
        self.lemmas.lock().clear();
        self.entries.lock().clear();
        self.page_ids.lock().clear();
        self.pages_buffered.store(0, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn pending_pages(&self) -> usize {
        self.pages.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SiteStatus;
    use crate::storage::SqliteStorage;
    use std::sync::Arc;

    fn pipeline(page_batch_size: usize) -> (IndexPipeline, SharedStorage, i64) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site_id = storage
            .insert_site("https://a.com", "A", SiteStatus::Indexing)
            .unwrap();
        let storage = Arc::new(Mutex::new(storage));
        let settings = BatchSettings {
            page_batch_size,
            lemma_batch_size: 2,
            index_batch_size: 3,
        };
        (
            IndexPipeline::new(Arc::clone(&storage), settings),
            storage,
            site_id,
        )
    }

    fn buffer_page_with(pipeline: &IndexPipeline, site_id: i64, path: &str, lemmas: &[(&str, u32)]) {
        let cancel = AtomicBool::new(false);
        let (page_key, flushed) = pipeline.buffer_page(site_id, path, 200, String::new(), &cancel);
        flushed.unwrap();
        for (lemma, count) in lemmas {
            let lemma_key = pipeline.buffer_lemma(site_id, lemma);
            pipeline.buffer_index_entry(page_key, lemma_key, f64::from(*count));
        }
    }

    #[test]
    fn test_pages_flush_when_batch_is_full() {
        let (pipeline, storage, site_id) = pipeline(2);

        buffer_page_with(&pipeline, site_id, "/a", &[]);
        assert_eq!(pipeline.pending_pages(), 1);
        buffer_page_with(&pipeline, site_id, "/b", &[]);
        assert_eq!(pipeline.pending_pages(), 0);

        assert_eq!(storage.lock().count_pages(Some(site_id)).unwrap(), 2);
    }

    #[test]
    fn test_persist_reconciles_and_resolves() {
        let (pipeline, storage, site_id) = pipeline(2);

        buffer_page_with(&pipeline, site_id, "/1", &[("кошка", 2), ("дом", 1)]);
        buffer_page_with(&pipeline, site_id, "/2", &[("дом", 4)]);
        buffer_page_with(&pipeline, site_id, "/3", &[("кошка", 1), ("дом", 1)]);
        buffer_page_with(&pipeline, site_id, "/4", &[("дом", 1)]);
        buffer_page_with(&pipeline, site_id, "/5", &[("кошка", 5)]);

        let summary = pipeline.persist(&AtomicBool::new(false)).unwrap();

        assert_eq!(summary.lemmas, 2);
        assert_eq!(summary.index_entries, 7);
        assert_eq!(summary.unresolved, 0);

        let storage = storage.lock();
        let cat = storage.get_lemma(site_id, "кошка").unwrap().unwrap();
        assert_eq!(cat.frequency, 3);
        assert_eq!(storage.count_pages_with_lemma(cat.id).unwrap(), 3);
        let house = storage.get_lemma(site_id, "дом").unwrap().unwrap();
        assert_eq!(house.frequency, 4);

        let page = storage.get_page_by_path(site_id, "/5").unwrap().unwrap();
        assert_eq!(storage.rank_sum(page.id, &[cat.id]).unwrap(), 5.0);
    }

    #[test]
    fn test_clear_drops_buffers() {
        let (pipeline, storage, site_id) = pipeline(10);
        buffer_page_with(&pipeline, site_id, "/1", &[("кошка", 1)]);

        pipeline.clear();
        let summary = pipeline.persist(&AtomicBool::new(false)).unwrap();

        assert_eq!(summary, PersistSummary::default());
        assert_eq!(storage.lock().count_pages(None).unwrap(), 0);
    }

    #[test]
    fn test_cancelled_persist_writes_nothing() {
        let (pipeline, storage, site_id) = pipeline(10);
        buffer_page_with(&pipeline, site_id, "/1", &[("кошка", 1)]);

        let summary = pipeline.persist(&AtomicBool::new(true)).unwrap();

        assert_eq!(summary.pages, 0);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(storage.lock().count_lemmas(None).unwrap(), 0);
    }
}
