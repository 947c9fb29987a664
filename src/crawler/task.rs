//! Recursive per-page crawl task
//!
//! Each task claims its URL, waits for a fetch slot and the politeness
//! delay, fetches and stores the page, then forks one child task per new
//! link and joins them all before completing.

use crate::crawler::fetcher::{FetchOutcome, FetchedPage, Fetcher};
use crate::crawler::node::CrawlNode;
use crate::crawler::parser::parse_html;
use crate::morphology::LemmaExtractor;
use crate::pipeline::IndexPipeline;
use crate::state::{CancelFlag, SeenUrls, SiteStatus};
use crate::storage::{SharedStorage, Storage};
use crate::url::{extract_path, LinkFilter};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Responses at or above this status are not stored
const HTTP_ERROR_CODE: u16 = 400;

/// Everything the tasks of one site share
pub struct SiteCrawl {
    pub site_id: i64,
    /// Normalized site URL, without a trailing slash
    pub site_url: String,
    /// The site URL as links to the root resolve (`https://host/`); the
    /// root node's URL
    pub root_url: String,
    pub fetcher: Fetcher,
    pub extractor: LemmaExtractor,
    pub filter: LinkFilter,
    pub pipeline: Arc<IndexPipeline>,
    pub storage: SharedStorage,
    pub seen: Arc<SeenUrls>,
    pub cancel: CancelFlag,
    /// Limits concurrent fetches for this site
    pub permits: Arc<Semaphore>,
    pub politeness_delay: Duration,
}

/// Crawls `node` and, recursively, every new link found below it
pub fn crawl_page(ctx: Arc<SiteCrawl>, node: Arc<CrawlNode>) -> BoxFuture<'static, ()> {
    async move {
        ctx.seen.claim(node.url());

        let page = match fetch_with_permit(&ctx, node.url()).await {
            Some(page) => page,
            None => return,
        };
        if ctx.cancel.is_set() {
            return;
        }

        let base = Url::parse(&page.url).or_else(|_| Url::parse(node.url()));
        let parsed = match base {
            Ok(base) => parse_html(&page.body, &base),
            Err(e) => {
                tracing::warn!("Cannot resolve links on {}: {}", node.url(), e);
                return;
            }
        };

        store_page(&ctx, node.url(), &page, &parsed.text);

        let mut children = Vec::new();
        for link in parsed.links {
            if !ctx.filter.accepts(&link, &ctx.site_url)
                || !ctx.seen.claim(&link)
                || ctx.cancel.is_set()
            {
                continue;
            }
            children.push(crawl_page(Arc::clone(&ctx), node.add_child(link)));
        }

        join_all(children).await;
    }
    .boxed()
}

/// Fetches `url` once a permit is free; the permit is released before
/// children run. Returns None when the page should not be processed.
async fn fetch_with_permit(ctx: &SiteCrawl, url: &str) -> Option<FetchedPage> {
    let _permit = ctx.permits.acquire().await.ok()?;

    tokio::time::sleep(ctx.politeness_delay).await;
    if ctx.cancel.is_set() {
        return None;
    }

    match ctx.fetcher.fetch(url).await {
        Ok(FetchOutcome::Page(page)) => Some(page),
        Ok(FetchOutcome::NotHtml { content_type }) => {
            tracing::debug!("Skipping {} ({})", url, content_type);
            None
        }
        Err(e) => {
            tracing::error!("Error in connection: {}", e);
            let message = e.to_string();
            if let Err(e) = ctx.storage.lock().update_site_status(
                ctx.site_id,
                SiteStatus::Failed,
                Some(&message),
            ) {
                tracing::error!("Failed to mark site {} as failed: {}", ctx.site_url, e);
            }
            None
        }
    }
}

/// Buffers the page and its lemmas unless it is the site root or an error page
fn store_page(ctx: &SiteCrawl, url: &str, page: &FetchedPage, text: &str) {
    if url == ctx.root_url || url == ctx.site_url || page.status_code >= HTTP_ERROR_CODE {
        return;
    }
    let path = match extract_path(url, &ctx.site_url) {
        Some(path) => path,
        None => return,
    };

    let (page_key, flushed) = ctx.pipeline.buffer_page(
        ctx.site_id,
        &path,
        page.status_code,
        page.body.clone(),
        ctx.cancel.as_atomic(),
    );
    if let Err(e) = flushed {
        tracing::error!("Failed to store a batch of pages: {}", e);
    }

    for (lemma, count) in ctx.extractor.extract(text) {
        let lemma_key = ctx.pipeline.buffer_lemma(ctx.site_id, &lemma);
        ctx.pipeline
            .buffer_index_entry(page_key, lemma_key, f64::from(count));
    }
}
