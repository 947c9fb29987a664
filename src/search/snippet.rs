//! Highlighted excerpts for search results

use crate::morphology::LemmaExtractor;
use regex::Regex;

/// Maximum gap, in characters, between two highlights that form a group
const GROUP_MAX_DISTANCE: usize = 30;

/// Excerpt length in characters, markup included
const SNIPPET_LENGTH: usize = 200;

const ELLIPSIS: &str = "...";

/// Builds snippets around the words of a page that match the query
#[derive(Clone)]
pub struct SnippetGenerator {
    extractor: LemmaExtractor,
    highlight: Regex,
}

impl SnippetGenerator {
    pub fn new(extractor: LemmaExtractor) -> Result<Self, regex::Error> {
        Ok(Self {
            extractor,
            highlight: Regex::new(r"<b>.*?</b>")?,
        })
    }

    /// Generates a snippet of `text` for the given query lemmas
    ///
    /// Every whole-word occurrence of a word whose lemma is in
    /// `query_lemmas` is wrapped in `<b>`. The excerpt starts at the first
    /// highlight that is followed by another within `GROUP_MAX_DISTANCE`
    /// characters, or at the first highlight if none is.
    pub fn generate(&self, text: &str, query_lemmas: &[String]) -> Result<String, regex::Error> {
        let text = fold_yo(text);
        let words = self.extractor.match_query_words(&text, query_lemmas);

        let mut marked = text;
        for word in &words {
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(word)))?;
            marked = pattern
                .replace_all(&marked, format!("<b>{}</b>", word).as_str())
                .into_owned();
        }

        let spans: Vec<(usize, usize)> = self
            .highlight
            .find_iter(&marked)
            .map(|m| (char_offset(&marked, m.start()), char_offset(&marked, m.end())))
            .collect();

        let start = spans
            .windows(2)
            .find(|pair| pair[1].0 - pair[0].1 <= GROUP_MAX_DISTANCE)
            .map(|pair| pair[0].0)
            .or_else(|| spans.first().map(|span| span.0))
            .unwrap_or(0);

        let mut snippet: String = marked.chars().skip(start).take(SNIPPET_LENGTH).collect();
        snippet.push_str(ELLIPSIS);
        Ok(snippet)
    }
}

/// Folds `ё` into `е`, matching how words are tokenized
fn fold_yo(text: &str) -> String {
    text.replace('ё', "е").replace('Ё', "Е")
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}
