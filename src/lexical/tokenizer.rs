//! Query and document tokenizer

use serde::{Deserialize, Serialize};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "i", "in", "is", "it", "its", "of", "on", "or", "she", "so", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "to", "was", "were", "will",
    "with",
];

/// Lowercasing, alphanumeric-run tokenizer with optional stop-word removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenizer {
    pub remove_stop_words: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            remove_stop_words: true,
        }
    }
}

impl Tokenizer {
    pub fn new(remove_stop_words: bool) -> Self {
        Self { remove_stop_words }
    }

    /// Split `text` into normalized tokens in document order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .filter(|token| !(self.remove_stop_words && is_stop_word(token)))
            .collect()
    }

    /// Tokenize a query, dropping repeated terms but keeping first-seen order.
    pub fn tokenize_query(&self, query: &str) -> Vec<String> {
        let mut tokens = self.tokenize(query);
        let mut seen = std::collections::HashSet::new();
        tokens.retain(|t| seen.insert(t.clone()));
        tokens
    }
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_words_sorted() {
        let mut sorted = STOP_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOP_WORDS);
    }

    #[test]
    fn test_tokenize() {
        let tokenizer = Tokenizer::default();
        assert_eq!(
            tokenizer.tokenize("Jon Snow stood at the Wall, north-of-it."),
            vec!["jon", "snow", "stood", "wall", "north"]
        );
    }

    #[test]
    fn test_keep_stop_words() {
        let tokenizer = Tokenizer::new(false);
        assert_eq!(tokenizer.tokenize("The Wall"), vec!["the", "wall"]);
    }

    #[test]
    fn test_query_dedup() {
        let tokenizer = Tokenizer::default();
        assert_eq!(
            tokenizer.tokenize_query("wall Wall snow WALL"),
            vec!["wall", "snow"]
        );
    }

    #[test]
    fn test_unicode_and_empty() {
        let tokenizer = Tokenizer::default();
        assert!(tokenizer.tokenize("  ,,, ").is_empty());
        assert_eq!(tokenizer.tokenize("Ärger über"), vec!["ärger", "über"]);
    }
}
