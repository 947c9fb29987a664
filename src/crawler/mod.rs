//! Crawler module for site indexing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a shared client
//! - HTML parsing, visible-text extraction and link extraction
//! - The recursive per-site crawl and its discovery graph
//! - Run coordination, cancellation and single-page re-indexing

mod coordinator;
mod fetcher;
mod node;
mod parser;
mod task;

pub use coordinator::{IndexingService, STOP_MESSAGE};
pub use fetcher::{build_http_client, FetchOutcome, FetchedPage, Fetcher};
pub use node::CrawlNode;
pub use parser::{extract_page_text, parse_html, PageText, ParsedPage};
pub use task::{crawl_page, SiteCrawl};
