use crate::morphology::{Morphology, WordAnalysis};
use crate::MorphologyError;
use std::collections::HashMap;
use std::path::Path;

/// Dictionary-backed analyzer
///
/// The dictionary is a UTF-8 text file with one analysis per line:
///
/// ```text
/// # surface	normal	tags
/// собаки	собака	С жр,ед,рд
/// и	и	СОЮЗ
/// ```
///
/// A surface form may appear on several lines; its normal forms and tags
/// accumulate in file order. Words missing from the dictionary analyze to
/// themselves with no tags.
#[derive(Debug, Clone, Default)]
pub struct DictionaryMorphology {
    entries: HashMap<String, WordAnalysis>,
}

impl DictionaryMorphology {
    /// An analyzer with no entries: every word is its own normal form
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a dictionary file
    pub fn load(path: &Path) -> Result<Self, MorphologyError> {
        let content = std::fs::read_to_string(path)?;
        let morphology = Self::parse(&content)?;
        tracing::info!(
            "Loaded {} dictionary entries from {}",
            morphology.len(),
            path.display()
        );
        Ok(morphology)
    }

    /// Parses dictionary text
    pub fn parse(content: &str) -> Result<Self, MorphologyError> {
        let mut morphology = Self::empty();

        for (index, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let surface = fields.next().map(str::trim).unwrap_or_default();
            let normal = fields.next().map(str::trim).unwrap_or_default();
            let tags = fields.next().map(str::trim).unwrap_or_default();

            if surface.is_empty() || normal.is_empty() {
                return Err(MorphologyError::Malformed {
                    line: index + 1,
                    reason: "expected at least surface and normal form".to_string(),
                });
            }

            morphology.insert(surface, normal, tags);
        }

        Ok(morphology)
    }

    /// Builds an analyzer from `(surface, normal, tags)` triples
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut morphology = Self::empty();
        for (surface, normal, tags) in entries {
            morphology.insert(surface, normal, tags);
        }
        morphology
    }

    fn insert(&mut self, surface: &str, normal: &str, tags: &str) {
        let analysis = self.entries.entry(surface.to_lowercase()).or_default();
        analysis.normal_forms.push(normal.to_lowercase());
        if !tags.is_empty() {
            analysis.tags.push(tags.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Morphology for DictionaryMorphology {
    fn analyze(&self, word: &str) -> WordAnalysis {
        match self.entries.get(word) {
            Some(analysis) => analysis.clone(),
            None => WordAnalysis {
                normal_forms: vec![word.to_string()],
                tags: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dictionary() {
        let content = "# comment\nсобаки\tсобака\tС жр,ед,рд\n\nи\tи\tСОЮЗ\n";
        let morphology = DictionaryMorphology::parse(content).unwrap();

        assert_eq!(morphology.len(), 2);
        let analysis = morphology.analyze("собаки");
        assert_eq!(analysis.normal_forms, vec!["собака".to_string()]);
        assert_eq!(analysis.tags, vec!["С жр,ед,рд".to_string()]);
    }

    #[test]
    fn test_repeated_surface_accumulates() {
        let morphology = DictionaryMorphology::from_entries([
            ("стали", "стать", "Г"),
            ("стали", "сталь", "С"),
        ]);

        let analysis = morphology.analyze("стали");
        assert_eq!(analysis.normal_forms, vec!["стать", "сталь"]);
        assert_eq!(analysis.tags.len(), 2);
    }

    #[test]
    fn test_unknown_word_is_its_own_normal_form() {
        let morphology = DictionaryMorphology::empty();
        let analysis = morphology.analyze("кошка");
        assert_eq!(analysis.normal_forms, vec!["кошка".to_string()]);
        assert!(analysis.tags.is_empty());
    }

    #[test]
    fn test_malformed_line() {
        let result = DictionaryMorphology::parse("собаки\n");
        assert!(matches!(
            result,
            Err(MorphologyError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = DictionaryMorphology::load(Path::new("/nonexistent/dictionary.tsv"));
        assert!(matches!(result, Err(MorphologyError::Io(_))));
    }
}
