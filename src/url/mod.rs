//! URL handling module for Lexicrawl
//!
//! This module provides site URL normalization, site-relative path
//! extraction and the static link filter applied during crawling.

mod filter;
mod normalize;

// Re-export main functions
pub use filter::LinkFilter;
pub use normalize::{canonical_page_url, extract_path, normalize_site_url, root_page_url};
