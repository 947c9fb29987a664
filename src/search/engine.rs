//! Query-time ranking over the lemma index

use crate::config::SearchConfig;
use crate::crawler::extract_page_text;
use crate::morphology::LemmaExtractor;
use crate::search::snippet::SnippetGenerator;
use crate::search::types::{SearchRequest, SearchResponse, SearchResult};
use crate::state::SiteStatus;
use crate::storage::{SharedStorage, SiteRecord, Storage};
use crate::url::normalize_site_url;
use crate::Result;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub const EMPTY_QUERY: &str = "An empty search query is set.";
pub const SITE_NOT_INDEXED: &str = "The specified site is not indexed.";
pub const NO_VALID_WORDS: &str = "The search query does not contain valid words";

/// Answers ranked queries from the persisted index
pub struct SearchEngine {
    storage: SharedStorage,
    extractor: LemmaExtractor,
    snippets: SnippetGenerator,
    config: SearchConfig,
}

/// A query lemma that survived frequency filtering
struct ScopedLemma {
    lemma: String,
    frequency: u64,
}

impl SearchEngine {
    pub fn new(
        storage: SharedStorage,
        extractor: LemmaExtractor,
        config: SearchConfig,
    ) -> Result<Self> {
        Ok(Self {
            storage,
            snippets: SnippetGenerator::new(extractor.clone())?,
            extractor,
            config,
        })
    }

    /// Runs a query
    ///
    /// Never fails: validation problems and internal errors are reported as
    /// failure responses.
    pub fn search(&self, request: &SearchRequest) -> SearchResponse {
        if request.query.trim().is_empty() {
            return SearchResponse::failure(EMPTY_QUERY);
        }

        match self.run(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Search for '{}' failed: {}", request.query, e);
                SearchResponse::failure(format!("Search failed: {}", e))
            }
        }
    }

    fn run(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let offset = match request.offset {
            Some(offset) if offset >= 0 => offset as usize,
            _ => 0,
        };
        let limit = match request.limit {
            Some(limit) if limit >= 1 => limit as usize,
            _ => self.config.default_limit,
        };

        let storage = self.storage.lock();

        let site = match request.site.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => match indexed_site(&*storage, url)? {
                Some(site) => Some(site),
                None => return Ok(SearchResponse::failure(SITE_NOT_INDEXED)),
            },
            _ => None,
        };
        let site_id = site.as_ref().map(|s| s.id);

        let mut query_lemmas: Vec<String> =
            self.extractor.extract(&request.query).into_keys().collect();
        if query_lemmas.is_empty() {
            return Ok(SearchResponse::failure(NO_VALID_WORDS));
        }
        query_lemmas.sort();

        let total_pages = storage.count_pages(site_id)?;
        let mut scoped = Vec::new();
        for lemma in &query_lemmas {
            let frequency = storage.lemma_frequency(lemma, site_id)?;
            if frequency == 0 {
                continue;
            }
            if frequency as f64 / total_pages as f64 > self.config.frequency_threshold {
                tracing::debug!("Ignoring common lemma '{}' ({} pages)", lemma, frequency);
                continue;
            }
            scoped.push(ScopedLemma {
                lemma: lemma.clone(),
                frequency,
            });
        }
        if scoped.is_empty() {
            return Ok(SearchResponse::success(0, Vec::new()));
        }
        scoped.sort_by_key(|l| l.frequency);

        let page_ids = intersect_postings(&*storage, &scoped, site_id)?;
        if page_ids.is_empty() {
            return Ok(SearchResponse::success(0, Vec::new()));
        }

        let mut all_lemma_ids = Vec::new();
        for lemma in &query_lemmas {
            all_lemma_ids.extend(storage.lemma_ids(lemma, site_id)?);
        }

        let mut relevance = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            relevance.push((page_id, storage.rank_sum(page_id, &all_lemma_ids)?));
        }
        let max = relevance
            .iter()
            .map(|(_, rank)| *rank)
            .fold(0.0_f64, f64::max);

        let mut sites: HashMap<i64, SiteRecord> = HashMap::new();
        let mut results = Vec::with_capacity(relevance.len());
        for (page_id, rank) in relevance {
            let page = storage.get_page(page_id)?;
            if !sites.contains_key(&page.site_id) {
                sites.insert(page.site_id, storage.get_site(page.site_id)?);
            }
            let owner = &sites[&page.site_id];

            let text = extract_page_text(&page.content);
            results.push((
                page_id,
                SearchResult {
                    site: owner.url.clone(),
                    site_name: owner.name.clone(),
                    uri: page.path,
                    title: text.title.unwrap_or_default(),
                    snippet: self.snippets.generate(&text.text, &query_lemmas)?,
                    relevance: if max > 0.0 { rank / max } else { 0.0 },
                },
            ));
        }

        results.sort_by(|(a_id, a), (b_id, b)| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a_id.cmp(b_id))
        });

        let count = results.len();
        let from = offset.min(count);
        let to = offset.saturating_add(limit).min(count);
        let data = results
            .into_iter()
            .skip(from)
            .take(to - from)
            .map(|(_, result)| result)
            .collect();

        Ok(SearchResponse::success(count, data))
    }
}

/// Resolves a site filter to an indexed site
fn indexed_site(storage: &dyn Storage, url: &str) -> Result<Option<SiteRecord>> {
    let normalized = match normalize_site_url(url) {
        Ok(normalized) => normalized,
        Err(_) => return Ok(None),
    };
    Ok(storage
        .find_site_by_url(&normalized)?
        .filter(|site| site.status == SiteStatus::Indexed))
}

/// Intersects posting lists, rarest lemma first
fn intersect_postings(
    storage: &dyn Storage,
    lemmas: &[ScopedLemma],
    site_id: Option<i64>,
) -> Result<Vec<i64>> {
    let mut pages: Option<Vec<i64>> = None;

    for scoped in lemmas {
        let ids = storage.lemma_ids(&scoped.lemma, site_id)?;
        let postings = storage.page_ids_for_lemmas(&ids)?;

        let next = match pages {
            None => postings,
            Some(current) => {
                let postings: HashSet<i64> = postings.into_iter().collect();
                current
                    .into_iter()
                    .filter(|id| postings.contains(id))
                    .collect()
            }
        };
        if next.is_empty() {
            return Ok(Vec::new());
        }
        pages = Some(next);
    }

    Ok(pages.unwrap_or_default())
}
