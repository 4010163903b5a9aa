//! Orchestrator settings

use serde::{Deserialize, Serialize};

use super::request::SearchMode;
use crate::fusion::FusionConfig;
use crate::graph::ExpansionOptions;
use crate::lexical::LexicalConfig;
use crate::vector::HnswConfig;

/// Graph expansion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSearchConfig {
    pub max_hops: usize,
    pub max_expanded: usize,
    pub min_cooccurrence: f32,
    /// Top hits used as expansion seeds.
    pub seed_limit: usize,
    /// Vector hits below this similarity never seed expansion.
    pub seed_min_similarity: f32,
}

impl Default for GraphSearchConfig {
    fn default() -> Self {
        let options = ExpansionOptions::default();
        Self {
            max_hops: options.max_hops,
            max_expanded: options.max_expanded,
            min_cooccurrence: options.min_cooccurrence,
            seed_limit: 5,
            seed_min_similarity: 0.3,
        }
    }
}

impl GraphSearchConfig {
    pub fn expansion_options(&self, max_hops: usize) -> ExpansionOptions {
        ExpansionOptions {
            max_hops,
            max_expanded: self.max_expanded,
            min_cooccurrence: self.min_cooccurrence,
        }
    }
}

/// Request defaults and candidate sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_mode: SearchMode,
    pub default_k: usize,
    /// Each signal retrieves `k * candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
    /// Snippet width in characters.
    pub snippet_width: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_mode: SearchMode::Hybrid,
            default_k: 10,
            candidate_multiplier: 3,
            snippet_width: 160,
        }
    }
}

/// Everything a [`super::SearchOrchestrator`] needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub lexical: LexicalConfig,
    pub hnsw: HnswConfig,
    pub fusion: FusionConfig,
    pub graph: GraphSearchConfig,
    pub search: SearchSettings,
    pub batch_size: usize,
    pub long_query_words: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            lexical: LexicalConfig::default(),
            hnsw: HnswConfig::default(),
            fusion: FusionConfig::default(),
            graph: GraphSearchConfig::default(),
            search: SearchSettings::default(),
            batch_size: 32,
            long_query_words: 12,
        }
    }
}
