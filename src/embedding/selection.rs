//! Query-time embedding model selection

use super::provider::ModelSize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller's model request. `Auto` defers to [`ModelSelector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    Small,
    Medium,
    #[default]
    Auto,
}

impl FromStr for ModelChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(ModelChoice::Small),
            "medium" => Ok(ModelChoice::Medium),
            "auto" => Ok(ModelChoice::Auto),
            other => Err(format!(
                "Unknown model '{}', expected small, medium or auto",
                other
            )),
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelChoice::Small => "small",
            ModelChoice::Medium => "medium",
            ModelChoice::Auto => "auto",
        })
    }
}

const ANALYTICAL_KEYWORDS: &[&str] = &[
    "analysis",
    "analyze",
    "compare",
    "comparison",
    "contrast",
    "difference",
    "differences",
    "evaluate",
    "explain",
    "relationship",
    "tradeoff",
    "tradeoffs",
    "versus",
    "vs",
    "why",
];

/// Picks a model tier for a query.
///
/// Long queries and queries that ask for comparison or analysis go to the
/// medium model; everything else uses the small one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSelector {
    /// Queries with at least this many words use the medium model.
    pub long_query_words: usize,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self {
            long_query_words: 12,
        }
    }
}

impl ModelSelector {
    /// Preferred tier for `query`, ignoring availability.
    pub fn preferred(&self, query: &str, choice: ModelChoice) -> ModelSize {
        match choice {
            ModelChoice::Small => ModelSize::Small,
            ModelChoice::Medium => ModelSize::Medium,
            ModelChoice::Auto => {
                let words: Vec<String> = query
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                    .map(str::to_lowercase)
                    .collect();
                let analytical = words
                    .iter()
                    .any(|w| ANALYTICAL_KEYWORDS.binary_search(&w.as_str()).is_ok());
                if analytical || words.len() >= self.long_query_words {
                    ModelSize::Medium
                } else {
                    ModelSize::Small
                }
            }
        }
    }

    /// Tier to use given what is `available`, falling back to any available
    /// tier when the preferred one is missing.
    pub fn select(
        &self,
        query: &str,
        choice: ModelChoice,
        available: &[ModelSize],
    ) -> Option<ModelSize> {
        let preferred = self.preferred(query, choice);
        if available.contains(&preferred) {
            return Some(preferred);
        }
        let fallback = available.first().copied();
        if let Some(model) = fallback {
            tracing::debug!("Model {} unavailable, using {}", preferred, model);
        }
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_sorted() {
        let mut sorted = ANALYTICAL_KEYWORDS.to_vec();
        sorted.sort();
        assert_eq!(sorted, ANALYTICAL_KEYWORDS);
    }

    #[test]
    fn test_short_query_uses_small() {
        let selector = ModelSelector::default();
        assert_eq!(selector.preferred("jon snow", ModelChoice::Auto), ModelSize::Small);
    }

    #[test]
    fn test_analytical_query_uses_medium() {
        let selector = ModelSelector::default();
        assert_eq!(
            selector.preferred("Compare Rust vs Go", ModelChoice::Auto),
            ModelSize::Medium
        );
        assert_eq!(
            selector.preferred("why is the wall there?", ModelChoice::Auto),
            ModelSize::Medium
        );
    }

    #[test]
    fn test_long_query_uses_medium() {
        let selector = ModelSelector::default();
        let query = "one two three four five six seven eight nine ten eleven twelve";
        assert_eq!(selector.preferred(query, ModelChoice::Auto), ModelSize::Medium);
    }

    #[test]
    fn test_explicit_choice_wins() {
        let selector = ModelSelector::default();
        assert_eq!(
            selector.preferred("compare everything", ModelChoice::Small),
            ModelSize::Small
        );
        assert_eq!(selector.preferred("hi", ModelChoice::Medium), ModelSize::Medium);
    }

    #[test]
    fn test_fallback_to_available() {
        let selector = ModelSelector::default();
        assert_eq!(
            selector.select("compare a and b", ModelChoice::Auto, &[ModelSize::Small]),
            Some(ModelSize::Small)
        );
        assert_eq!(selector.select("x", ModelChoice::Small, &[]), None);
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!("AUTO".parse::<ModelChoice>().unwrap(), ModelChoice::Auto);
        assert!("large".parse::<ModelChoice>().is_err());
    }
}
