//! Resonance - hybrid retrieval core for personal notes
//!
//! Combines a BM25F lexical scorer with proximity and phrase boosts, HNSW
//! vector indexes over note embeddings, and bounded expansion across an
//! entity co-occurrence graph. The ranked lists are merged with weighted
//! reciprocal rank fusion.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod graph;
pub mod lexical;
pub mod search;
pub mod storage;
pub mod vector;

pub use error::{ResonanceError, Result};
