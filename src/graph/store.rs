//! Read interface to entity mentions and co-occurrence edges

use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    #[error("Graph query failed: {0}")]
    Query(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },
}

/// One co-occurrence edge seen from `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjacency {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

/// Source of entity mentions and co-occurrence adjacency.
///
/// Edges are logically undirected: `neighbors` reports each edge from
/// whichever endpoint was asked about.
pub trait GraphStore: Send + Sync {
    /// Mentioned entity ids per document. Documents without mentions are omitted.
    fn entities_for_documents(
        &self,
        document_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphError>;

    /// Edges touching any of `entity_ids` with weight at least `min_weight`.
    fn neighbors(&self, entity_ids: &[String], min_weight: f32)
        -> Result<Vec<Adjacency>, GraphError>;

    /// Documents mentioning any of `entity_ids`, with the matching entities.
    fn documents_for_entities(
        &self,
        entity_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphError>;
}

/// Order an entity pair so each undirected edge has one key.
pub(crate) fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
