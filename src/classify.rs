//! Rule-based relevance filter and multi-label categorizer.
//!
//! Both operate on raw free text with case-insensitive substring matching
//! against the configured Hebrew/English keyword lists. Matching is not
//! tokenized, so a short keyword such as `PR` also fires inside longer
//! words; the exclusion list is the tool for pruning such false positives.

use crate::config::{ClassifierConfig, TextScope};

/// Keyword classifier built once per run from [`ClassifierConfig`].
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<String>,
    exclusions: Vec<String>,
    categories: Vec<(String, Vec<String>)>,
    default_category: String,
    relevance_scope: TextScope,
    category_scope: TextScope,
}

fn lowered(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            keywords: lowered(&config.keywords),
            exclusions: lowered(&config.exclusions),
            categories: config
                .categories
                .iter()
                .map(|c| (c.name.clone(), lowered(&c.synonyms)))
                .collect(),
            default_category: config.default_category.clone(),
            relevance_scope: config.relevance_scope,
            category_scope: config.category_scope,
        }
    }

    /// True iff `text` contains an inclusion keyword and no exclusion keyword.
    ///
    /// Exclusions are checked first and always win.
    pub fn matches_keywords(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        if contains_any(&text, &self.exclusions) {
            return false;
        }
        contains_any(&text, &self.keywords)
    }

    /// Category labels whose synonyms occur in `text`, in taxonomy order.
    ///
    /// Never empty: falls back to the configured default category.
    pub fn categorize(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        let matched: Vec<String> = self
            .categories
            .iter()
            .filter(|(_, synonyms)| contains_any(&text, synonyms))
            .map(|(name, _)| name.clone())
            .collect();

        if matched.is_empty() {
            vec![self.default_category.clone()]
        } else {
            matched
        }
    }

    /// Relevance gate for one listing, honouring the configured scope.
    pub fn is_relevant(&self, title: &str, fragment_text: &str) -> bool {
        self.matches_keywords(&scoped(self.relevance_scope, title, fragment_text))
    }

    /// Categories for one listing, honouring the configured scope.
    pub fn categories_for(&self, title: &str, fragment_text: &str) -> Vec<String> {
        self.categorize(&scoped(self.category_scope, title, fragment_text))
    }
}

fn scoped(scope: TextScope, title: &str, fragment_text: &str) -> String {
    match scope {
        TextScope::Title => title.to_string(),
        TextScope::TitleAndText => format!("{title} {fragment_text}"),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::config::CategoryRule;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    pub fn classifier_config() -> ClassifierConfig {
        ClassifierConfig {
            keywords: strings(&["דוברות", "יחסי ציבור", "תקשורת", "פרסום", "PR"]),
            exclusions: strings(&["תקשורת מחשבים", "סיבים אופטיים"]),
            categories: vec![
                CategoryRule {
                    name: "דוברות".into(),
                    synonyms: strings(&["דוברות", "דובר"]),
                },
                CategoryRule {
                    name: "יחסי ציבור".into(),
                    synonyms: strings(&["יחסי ציבור", "PR"]),
                },
                CategoryRule {
                    name: "פרסום".into(),
                    synonyms: strings(&["פרסום", "קמפיין"]),
                },
            ],
            default_category: "תקשורת".into(),
            relevance_scope: TextScope::Title,
            category_scope: TextScope::TitleAndText,
        }
    }

    pub fn classifier() -> Classifier {
        Classifier::new(&classifier_config())
    }
}
