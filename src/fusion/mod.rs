//! Rank fusion
//!
//! Combines the lexical, vector and graph rankings of one query with weighted
//! Reciprocal Rank Fusion.

mod rrf;
mod types;

pub use rrf::{fuse, min_max_normalize, FusionConfig, SignalLists};
pub use types::{
    CandidateResult, FusionWeights, RankedResult, Signal, SignalBreakdown, SignalEntry,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight configuration: {0}")]
    InvalidWeights(String),

    #[error("Invalid RRF constant: {0}")]
    InvalidConstant(f32),
}
