mod batch;
/// Embedding generation
///
/// - EmbeddingProvider trait for abstraction over embedding backends
/// - FastEmbedProvider for local embedding (small and medium model tiers)
/// - ModelSelector for picking a tier per query
/// - BatchIndexer for cancellable bulk indexing
mod provider;
mod selection;

pub use batch::{BatchIndexer, IndexingError, IndexingReport};
pub use provider::{
    EmbeddingError, EmbeddingProvider, FastEmbedProvider, ModelSize, DEFAULT_MEDIUM_MODEL,
    DEFAULT_SMALL_MODEL,
};
pub use selection::{ModelChoice, ModelSelector};

use serde::{Deserialize, Serialize};

/// Configuration for embedding generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model behind the small tier (e.g., "all-MiniLM-L6-v2")
    pub small_model: String,
    /// Model behind the medium tier (e.g., "bge-base-en-v1.5")
    pub medium_model: String,
    /// Tiers to load at startup
    pub enabled_models: Vec<ModelSize>,
    /// Notes embedded per batch during bulk indexing
    pub batch_size: usize,
    /// Queries with at least this many words prefer the medium tier
    pub long_query_words: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            small_model: DEFAULT_SMALL_MODEL.to_string(),
            medium_model: DEFAULT_MEDIUM_MODEL.to_string(),
            enabled_models: vec![ModelSize::Small],
            batch_size: 32,
            long_query_words: 12,
        }
    }
}

impl EmbeddingConfig {
    /// Load the enabled tiers with FastEmbed.
    pub fn provider(&self) -> Result<FastEmbedProvider, EmbeddingError> {
        let small = self
            .enabled_models
            .contains(&ModelSize::Small)
            .then_some(self.small_model.as_str());
        let medium = self
            .enabled_models
            .contains(&ModelSize::Medium)
            .then_some(self.medium_model.as_str());
        FastEmbedProvider::new(small, medium)
    }

    pub fn selector(&self) -> ModelSelector {
        ModelSelector {
            long_query_words: self.long_query_words,
        }
    }
}
