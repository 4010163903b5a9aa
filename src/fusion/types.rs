//! Fusion inputs and outputs

use serde::{Deserialize, Serialize};

use super::FusionError;

/// Retrieval signal a ranked list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Lexical,
    Vector,
    Graph,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Lexical, Signal::Vector, Signal::Graph];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Lexical => "lexical",
            Signal::Vector => "vector",
            Signal::Graph => "graph",
        }
    }
}

/// One entry in a signal's list. Higher `score` ranks earlier.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEntry {
    pub document_id: String,
    pub score: f32,
}

impl SignalEntry {
    pub fn new(document_id: impl Into<String>, score: f32) -> Self {
        Self {
            document_id: document_id.into(),
            score,
        }
    }
}

/// Raw per-signal values for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<f32>,
}

impl SignalBreakdown {
    pub fn get(&self, signal: Signal) -> Option<f32> {
        match signal {
            Signal::Lexical => self.lexical,
            Signal::Vector => self.vector,
            Signal::Graph => self.graph,
        }
    }

    pub fn set(&mut self, signal: Signal, value: f32) {
        match signal {
            Signal::Lexical => self.lexical = Some(value),
            Signal::Vector => self.vector = Some(value),
            Signal::Graph => self.graph = Some(value),
        }
    }
}

/// A document under consideration for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub document_id: String,
    /// Weighted reciprocal-rank sum.
    pub score: f32,
    pub signals: SignalBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_distance: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connected_entities: Vec<String>,
}

/// A fused, ordered result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub candidate: CandidateResult,
    /// Presentation score (min-max normalized when enabled).
    pub final_score: f32,
    /// 1-based rank within each signal that had a list; missing documents
    /// get that list's length + 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_rank: Option<usize>,
}

impl RankedResult {
    pub fn document_id(&self) -> &str {
        &self.candidate.document_id
    }

    pub fn rank(&self, signal: Signal) -> Option<usize> {
        match signal {
            Signal::Lexical => self.lexical_rank,
            Signal::Vector => self.vector_rank,
            Signal::Graph => self.graph_rank,
        }
    }
}

/// Per-signal fusion weights. They need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector_weight: f32,
    pub graph_weight: f32,
    pub lexical_weight: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector_weight: 1.0,
            graph_weight: 0.5,
            lexical_weight: 1.0,
        }
    }
}

impl FusionWeights {
    pub fn new(vector_weight: f32, graph_weight: f32, lexical_weight: f32) -> Result<Self, FusionError> {
        let weights = Self {
            vector_weight,
            graph_weight,
            lexical_weight,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Weights must be finite, non-negative and not all zero.
    pub fn validate(&self) -> Result<(), FusionError> {
        let all = [self.vector_weight, self.graph_weight, self.lexical_weight];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(FusionError::InvalidWeights(format!(
                "weights must be finite and non-negative, got {:?}",
                all
            )));
        }
        if all.iter().all(|w| *w == 0.0) {
            return Err(FusionError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get(&self, signal: Signal) -> f32 {
        match signal {
            Signal::Lexical => self.lexical_weight,
            Signal::Vector => self.vector_weight,
            Signal::Graph => self.graph_weight,
        }
    }

    /// Weights scaled to sum to 1, for display.
    pub fn normalized(&self) -> Self {
        let sum = self.vector_weight + self.graph_weight + self.lexical_weight;
        if sum <= 0.0 {
            return *self;
        }
        Self {
            vector_weight: self.vector_weight / sum,
            graph_weight: self.graph_weight / sum,
            lexical_weight: self.lexical_weight / sum,
        }
    }
}
