//! Morphology module: word analysis and lemma extraction
//!
//! The analyzer itself sits behind the [`Morphology`] trait so the crawler
//! and the search engine do not care where normal forms come from.
//! [`DictionaryMorphology`] is the bundled implementation, backed by a
//! tab-separated word list.

mod dictionary;
mod extractor;

pub use dictionary::DictionaryMorphology;
pub use extractor::LemmaExtractor;

/// The result of analyzing one lowercase word
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordAnalysis {
    /// Candidate normal forms, most likely first
    pub normal_forms: Vec<String>,

    /// Grammatical tags, one string per analysis
    pub tags: Vec<String>,
}

/// A morphological analyzer
///
/// Implementations must be infallible per call; any failure to prepare the
/// analyzer is reported when it is constructed.
pub trait Morphology: Send + Sync {
    fn analyze(&self, word: &str) -> WordAnalysis;
}
