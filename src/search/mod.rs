//! Search orchestration
//!
//! Turns a [`SearchRequest`] into ranked, hydrated results: lexical and
//! vector candidates, entity-graph expansion from the best of them, then
//! weighted rank fusion. Auxiliary signals that fail are dropped with a
//! warning instead of failing the search.

mod indexes;
mod notes;
mod orchestrator;
mod request;
mod settings;
mod snippet;

pub use indexes::SearchIndexes;
pub use notes::{load_notes_from_dir, Note, NoteStore};
pub use orchestrator::{IndexStats, SearchOrchestrator, VectorStats};
pub use request::{
    DateRange, HybridOptions, SearchHit, SearchMetadata, SearchMode, SearchRequest,
    SearchResponse,
};
pub use settings::{GraphSearchConfig, OrchestratorSettings, SearchSettings};
pub use snippet::make_snippet;

use thiserror::Error;

use crate::fusion::FusionError;
use crate::lexical::LexicalError;
use crate::vector::VectorIndexError;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector search failed: {0}")]
    VectorIndex(VectorIndexError),

    #[error("Lexical indexing failed: {0}")]
    Lexical(#[from] LexicalError),

    #[error("Fusion failed: {0}")]
    Fusion(#[from] FusionError),
}

impl From<VectorIndexError> for SearchError {
    fn from(e: VectorIndexError) -> Self {
        match e {
            VectorIndexError::DimensionMismatch { expected, actual } => {
                SearchError::DimensionMismatch { expected, actual }
            }
            other => SearchError::VectorIndex(other),
        }
    }
}
