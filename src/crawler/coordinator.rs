//! Indexing service - full crawl orchestration and single-page indexing
//!
//! This module owns the lifecycle of an indexing run:
//! - Resetting the store, buffers and seen-set at start
//! - Dispatching one crawl per configured site
//! - Reconciling and persisting once every site has finished
//! - Cancelling a run on request, with a bounded wind-down

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchOutcome, Fetcher};
use crate::crawler::node::CrawlNode;
use crate::crawler::parser::extract_page_text;
use crate::crawler::task::{crawl_page, SiteCrawl};
use crate::morphology::{LemmaExtractor, Morphology};
use crate::pipeline::{BatchSettings, IndexPipeline};
use crate::state::{CancelFlag, IndexingPhase, SeenUrls, SiteStatus};
use crate::storage::{SharedStorage, SiteRecord, Storage};
use crate::url::{canonical_page_url, extract_path, normalize_site_url, root_page_url, LinkFilter};
use crate::{LexiError, Result};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};

/// Status message recorded for sites interrupted by a stop request
pub const STOP_MESSAGE: &str = "Indexing stopped by the user.";

/// Task handles of the current run
#[derive(Default)]
struct RunHandles {
    /// One unit per site; the last one to finish also persists the run
    dispatch: Vec<JoinHandle<()>>,
    /// The crawl task of each site
    site_pools: Vec<AbortHandle>,
}

struct Inner {
    config: Arc<Config>,
    storage: SharedStorage,
    pipeline: Arc<IndexPipeline>,
    fetcher: Fetcher,
    extractor: LemmaExtractor,
    filter: LinkFilter,
    seen: Arc<SeenUrls>,
    cancel: CancelFlag,
    phase: watch::Sender<IndexingPhase>,
    /// True from a stop request until the stopped run's dispatch has wound down
    shutting_down: watch::Sender<bool>,
    handles: Mutex<RunHandles>,
    started_at: Mutex<Option<Instant>>,
}

/// Entry point for full and single-page indexing
///
/// Cheap to clone; all clones drive the same run.
#[derive(Clone)]
pub struct IndexingService {
    inner: Arc<Inner>,
}

impl IndexingService {
    /// Creates the service
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `storage` - Shared database handle
    /// * `morphology` - Analyzer used to extract lemmas from pages
    pub fn new(
        config: Config,
        storage: SharedStorage,
        morphology: Arc<dyn Morphology>,
    ) -> Result<Self> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_millis(config.crawler.request_timeout),
        )?;
        let pipeline = IndexPipeline::new(
            Arc::clone(&storage),
            BatchSettings::from(&config.storage),
        );
        let (phase, _) = watch::channel(IndexingPhase::Idle);
        let (shutting_down, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                storage,
                pipeline: Arc::new(pipeline),
                fetcher: Fetcher::new(client),
                extractor: LemmaExtractor::new(morphology),
                filter: LinkFilter::new()?,
                seen: Arc::new(SeenUrls::new()),
                cancel: CancelFlag::new(),
                phase,
                shutting_down,
                handles: Mutex::new(RunHandles::default()),
                started_at: Mutex::new(None),
            }),
        })
    }

    /// True while a full run is crawling or persisting
    pub fn is_indexing(&self) -> bool {
        !self.inner.phase.borrow().is_idle()
    }

    /// Starts a full re-index of every configured site
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The run was started
    /// * `Ok(false)` - A run is active or the previous one is still shutting down
    /// * `Err(LexiError)` - The store could not be reset; no run was started
    pub fn start_indexing(&self) -> Result<bool> {
        let inner = &self.inner;
        let site_count = inner.config.sites.len();

        if *inner.shutting_down.borrow() {
            return Ok(false);
        }
        let accepted = inner.phase.send_if_modified(|phase| {
            if phase.is_idle() {
                *phase = IndexingPhase::Crawling {
                    remaining: site_count,
                };
                true
            } else {
                false
            }
        });
        if !accepted {
            return Ok(false);
        }

        let mut handles = inner.handles.lock();
        let sites = match self.reset_run() {
            Ok(sites) => sites,
            Err(e) => {
                inner.phase.send_replace(IndexingPhase::Idle);
                return Err(e);
            }
        };

        *handles = RunHandles::default();
        *inner.started_at.lock() = Some(Instant::now());
        tracing::info!("Starting indexing of {} sites", sites.len());

        for site in sites {
            let service = self.clone();
            handles
                .dispatch
                .push(tokio::spawn(async move { service.run_site(site).await }));
        }

        Ok(true)
    }

    /// Clears all per-run state and registers the configured sites
    fn reset_run(&self) -> Result<Vec<SiteRecord>> {
        let inner = &self.inner;
        inner.cancel.reset();
        inner.seen.clear();
        inner.pipeline.clear();

        let mut storage = inner.storage.lock();
        storage.delete_all()?;

        let mut sites = Vec::with_capacity(inner.config.sites.len());
        for entry in &inner.config.sites {
            let url = normalize_site_url(&entry.url)?;
            let id = storage.insert_site(&url, &entry.name, SiteStatus::Indexing)?;
            sites.push(storage.get_site(id)?);
        }
        Ok(sites)
    }

    /// Dispatch unit for one site
    async fn run_site(self, site: SiteRecord) {
        let inner = &self.inner;
        let root_url = root_page_url(&site.url).unwrap_or_else(|_| site.url.clone());
        let ctx = Arc::new(SiteCrawl {
            site_id: site.id,
            site_url: site.url.clone(),
            root_url: root_url.clone(),
            fetcher: inner.fetcher.clone(),
            extractor: inner.extractor.clone(),
            filter: inner.filter.clone(),
            pipeline: Arc::clone(&inner.pipeline),
            storage: Arc::clone(&inner.storage),
            seen: Arc::clone(&inner.seen),
            cancel: inner.cancel.clone(),
            permits: Arc::new(Semaphore::new(
                inner.config.crawler.max_concurrent_pages_open as usize,
            )),
            politeness_delay: Duration::from_millis(inner.config.crawler.politeness_delay),
        });
        let root = Arc::new(CrawlNode::new(root_url));

        let crawl = tokio::spawn(crawl_page(ctx, Arc::clone(&root)));
        inner.handles.lock().site_pools.push(crawl.abort_handle());
        if inner.cancel.is_set() {
            crawl.abort();
        }

        if let Err(e) = crawl.await {
            if !e.is_cancelled() {
                tracing::error!("Crawl task for {} failed: {}", site.url, e);
            }
        }

        if inner.cancel.is_set() {
            return;
        }
        tracing::info!(
            "Finished crawling {} ({} linked pages)",
            site.url,
            root.descendant_count()
        );

        let mut finalize = false;
        inner
            .phase
            .send_modify(|phase| finalize = phase.complete_site());
        if finalize {
            self.finalize().await;
        }
    }

    /// Persists buffered lemmas and entries, then settles site statuses
    async fn finalize(&self) {
        let inner = Arc::clone(&self.inner);
        let persisted = tokio::task::spawn_blocking(move || {
            let cancel = inner.cancel.as_atomic();
            let outcome = inner.pipeline.persist(cancel);
            if inner.cancel.is_set() {
                return outcome.map_err(LexiError::from);
            }

            let mut storage = inner.storage.lock();
            match &outcome {
                Ok(_) => {
                    storage.mark_unfailed_sites_indexed()?;
                }
                Err(e) => {
                    storage.fail_indexing_sites(&format!("Failed to store the index: {}", e))?;
                }
            }
            outcome.map_err(LexiError::from)
        })
        .await;

        match persisted {
            Ok(Ok(summary)) => tracing::info!(
                "Stored {} pages, {} lemmas and {} index entries",
                summary.pages,
                summary.lemmas,
                summary.index_entries
            ),
            Ok(Err(e)) => tracing::error!("Failed to persist the index: {}", e),
            Err(e) => tracing::error!("Persist task failed: {}", e),
        }

        if let Some(started) = self.inner.started_at.lock().take() {
            tracing::info!(
                "Sites indexing took: {} seconds ({} URLs visited)",
                started.elapsed().as_secs(),
                self.inner.seen.len()
            );
        }

        *self.inner.handles.lock() = RunHandles::default();
        self.inner.phase.send_replace(IndexingPhase::Idle);
    }

    /// Stops the active run
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Returns
    ///
    /// `false` if no run was active
    pub fn stop_indexing(&self) -> bool {
        let inner = &self.inner;
        if inner.phase.borrow().is_idle() {
            return false;
        }
        let claimed = inner.shutting_down.send_if_modified(|shutting_down| {
            !std::mem::replace(shutting_down, true)
        });
        if !claimed {
            return false;
        }

        inner.cancel.set();
        let handles = std::mem::take(&mut *inner.handles.lock());
        for pool in &handles.site_pools {
            pool.abort();
        }

        match inner.storage.lock().fail_indexing_sites(STOP_MESSAGE) {
            Ok(count) => tracing::info!("Marked {} sites as failed", count),
            Err(e) => tracing::error!("Failed to update site statuses: {}", e),
        }

        inner.phase.send_replace(IndexingPhase::Idle);
        tracing::info!("{}", STOP_MESSAGE);

        let grace = Duration::from_secs(inner.config.crawler.shutdown_grace_period);
        tokio::spawn(shutdown_dispatch(
            Arc::clone(&self.inner),
            handles.dispatch,
            grace,
        ));
        true
    }

    /// Waits until no run is active and any stopped run has wound down
    pub async fn wait_until_idle(&self) {
        // both senders live in `inner`, so the waits only fail if it was dropped
        let mut phase = self.inner.phase.subscribe();
        let _ = phase.wait_for(IndexingPhase::is_idle).await;

        let mut shutting_down = self.inner.shutting_down.subscribe();
        let _ = shutting_down.wait_for(|shutting_down| !*shutting_down).await;
    }

    /// Re-indexes a single page
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The page was fetched and its index contribution replaced
    /// * `Ok(false)` - Rejected: a run is active, the URL is blank or outside
    ///   every configured site, or the page could not be fetched
    /// * `Err(LexiError)` - A storage error
    pub async fn index_page(&self, url: &str) -> Result<bool> {
        let inner = &self.inner;
        if self.is_indexing() || *inner.shutting_down.borrow() {
            return Ok(false);
        }
        let url = url.trim();
        if url.is_empty() {
            return Ok(false);
        }

        let (site, path) = match self.resolve_site(url)? {
            Some(resolved) => resolved,
            None => {
                tracing::info!("{} does not belong to any configured site", url);
                return Ok(false);
            }
        };

        let page = match inner.fetcher.fetch(url).await {
            Ok(FetchOutcome::Page(page)) => page,
            Ok(FetchOutcome::NotHtml { content_type }) => {
                tracing::info!("Not indexing {}: content type {}", url, content_type);
                return Ok(false);
            }
            Err(e) => {
                let message = format!("Error connecting to the page: {}", url);
                tracing::error!("{} ({})", message, e);
                inner
                    .storage
                    .lock()
                    .update_site_status(site.id, SiteStatus::Failed, Some(&message))?;
                return Ok(false);
            }
        };

        let text = extract_page_text(&page.body).text;
        let lemmas = inner.extractor.extract(&text);

        let mut storage = inner.storage.lock();
        storage.reindex_page(site.id, &path, page.status_code, &page.body, &lemmas)?;
        storage.update_site_status(site.id, SiteStatus::Indexed, None)?;

        tracing::info!("The page at: {} has been updated", url);
        Ok(true)
    }

    /// Finds the site a page belongs to, registering a configured site lazily
    fn resolve_site(&self, url: &str) -> Result<Option<(SiteRecord, String)>> {
        let page_url = match canonical_page_url(url) {
            Ok(page_url) => page_url,
            Err(_) => return Ok(None),
        };

        let mut storage = self.inner.storage.lock();
        for site in storage.list_sites()? {
            if let Some(path) = extract_path(&page_url, &site.url) {
                return Ok(Some((site, path)));
            }
        }

        for entry in &self.inner.config.sites {
            let site_url = normalize_site_url(&entry.url)?;
            if let Some(path) = extract_path(&page_url, &site_url) {
                let id = storage.insert_site(&site_url, &entry.name, SiteStatus::Indexing)?;
                tracing::info!("Registered site {} for single-page indexing", site_url);
                return Ok(Some((storage.get_site(id)?, path)));
            }
        }

        Ok(None)
    }
}

/// Waits for dispatch units to finish, aborting them after `grace`
async fn shutdown_dispatch(inner: Arc<Inner>, dispatch: Vec<JoinHandle<()>>, grace: Duration) {
    tracing::info!("Shutting down site dispatch");
    let aborts: Vec<AbortHandle> = dispatch.iter().map(JoinHandle::abort_handle).collect();

    if tokio::time::timeout(grace, join_all(dispatch)).await.is_err() {
        tracing::warn!(
            "Site dispatch did not finish within {:?}, aborting",
            grace
        );
        for handle in aborts {
            handle.abort();
        }
    }

    inner.shutting_down.send_replace(false);
    tracing::info!("Site dispatch shutdown finished");
}
