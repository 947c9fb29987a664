//! Search module
//!
//! Turns a free-text query into lemmas, intersects their posting lists and
//! ranks the matching pages by summed lemma rank, with highlighted snippets.

mod engine;
mod snippet;
mod types;

pub use engine::{SearchEngine, EMPTY_QUERY, NO_VALID_WORDS, SITE_NOT_INDEXED};
pub use snippet::SnippetGenerator;
pub use types::{SearchRequest, SearchResponse, SearchResult};
