use crate::morphology::Morphology;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Tags of the parts of speech that carry no meaning on their own:
/// interjection, conjunction, preposition and particle
const FUNCTIONAL_TAGS: [&str; 4] = ["МЕЖД", "СОЮЗ", "ПРЕДЛ", "ЧАСТ"];

/// Normal forms shorter than this are not indexed
const MIN_LEMMA_LENGTH: usize = 3;

/// Turns free text into lemma counts
#[derive(Clone)]
pub struct LemmaExtractor {
    morphology: Arc<dyn Morphology>,
}

impl LemmaExtractor {
    pub fn new(morphology: Arc<dyn Morphology>) -> Self {
        Self { morphology }
    }

    /// Counts the lemmas occurring in `text`
    ///
    /// # Example
    ///
    /// ```
    /// use lexicrawl::morphology::{DictionaryMorphology, LemmaExtractor};
    /// use std::sync::Arc;
    ///
    /// let morphology = DictionaryMorphology::from_entries([("собаки", "собака", "С")]);
    /// let extractor = LemmaExtractor::new(Arc::new(morphology));
    /// let lemmas = extractor.extract("Собаки и собака");
    /// assert_eq!(lemmas.get("собака"), Some(&2));
    /// ```
    pub fn extract(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for token in tokenize(text) {
            if let Some(lemma) = self.lemma_of(&token.to_lowercase()) {
                *counts.entry(lemma).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Returns the distinct surface words of `text` whose lemma is one of
    /// `query_lemmas`, in order of first appearance
    pub fn match_query_words(&self, text: &str, query_lemmas: &[String]) -> Vec<String> {
        let wanted: HashSet<&str> = query_lemmas.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut words = Vec::new();

        for token in tokenize(text) {
            if !seen.insert(token.clone()) {
                continue;
            }
            if let Some(lemma) = self.lemma_of(&token.to_lowercase()) {
                if wanted.contains(lemma.as_str()) {
                    words.push(token);
                }
            }
        }

        words
    }

    fn lemma_of(&self, word: &str) -> Option<String> {
        let analysis = self.morphology.analyze(word);
        let lemma = analysis.normal_forms.into_iter().next()?;

        let functional = analysis
            .tags
            .iter()
            .any(|tag| FUNCTIONAL_TAGS.iter().any(|marker| tag.contains(marker)));
        if functional || lemma.chars().count() < MIN_LEMMA_LENGTH {
            return None;
        }

        Some(lemma)
    }
}

/// Splits text into runs of Cyrillic letters, folding `ё` into `е`
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        let c = match c {
            'ё' => 'е',
            'Ё' => 'Е',
            other => other,
        };
        if matches!(c, 'а'..='я' | 'А'..='Я') {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::DictionaryMorphology;

    fn extractor() -> LemmaExtractor {
        let morphology = DictionaryMorphology::from_entries([
            ("собаки", "собака", "С жр,мн,им"),
            ("собаку", "собака", "С жр,ед,вн"),
            ("бежали", "бежать", "Г мн,прш"),
            ("и", "и", "СОЮЗ"),
            ("через", "через", "ПРЕДЛ"),
            ("ведь", "ведь", "ЧАСТ"),
            ("ежики", "ежик", "С мр,мн,им"),
        ]);
        LemmaExtractor::new(Arc::new(morphology))
    }

    #[test]
    fn test_extract_counts_lemmas() {
        let lemmas = extractor().extract("Собаки бежали через поле, и собаку догнали.");

        assert_eq!(lemmas.get("собака"), Some(&2));
        assert_eq!(lemmas.get("бежать"), Some(&1));
        assert_eq!(lemmas.get("поле"), Some(&1));
        assert_eq!(lemmas.get("догнали"), Some(&1));
    }

    #[test]
    fn test_functional_words_are_dropped() {
        let lemmas = extractor().extract("через ведь и");
        assert!(lemmas.is_empty());
    }

    #[test]
    fn test_short_lemmas_are_dropped() {
        let lemmas = extractor().extract("он на дом");
        assert!(!lemmas.contains_key("он"));
        assert!(!lemmas.contains_key("на"));
        assert_eq!(lemmas.get("дом"), Some(&1));
    }

    #[test]
    fn test_non_cyrillic_is_ignored() {
        let lemmas = extractor().extract("hello 123 world");
        assert!(lemmas.is_empty());
    }

    #[test]
    fn test_yo_is_folded() {
        let lemmas = extractor().extract("Ёжики");
        assert_eq!(lemmas.get("ежик"), Some(&1));
    }

    #[test]
    fn test_match_query_words_keeps_surface_forms() {
        let words = extractor().match_query_words(
            "Собаки бежали, собаку звали. Собаки устали.",
            &["собака".to_string()],
        );
        assert_eq!(words, vec!["Собаки".to_string(), "собаку".to_string()]);
    }

    #[test]
    fn test_tokenize_splits_on_non_letters() {
        assert_eq!(tokenize("раз,два-три"), vec!["раз", "два", "три"]);
    }
}
