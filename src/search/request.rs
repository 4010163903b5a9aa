//! Search request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::embedding::ModelChoice;
use crate::fusion::{FusionWeights, Signal, SignalBreakdown};

/// Which retrieval signals a search uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Lexical scorer only
    Lexical,
    /// Vector index only; needs a query embedding
    Semantic,
    /// Lexical and vector, plus graph expansion when available
    #[default]
    Hybrid,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" => Ok(SearchMode::Lexical),
            "semantic" => Ok(SearchMode::Semantic),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!(
                "Unknown search mode '{}', expected lexical, semantic or hybrid",
                other
            )),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMode::Lexical => "lexical",
            SearchMode::Semantic => "semantic",
            SearchMode::Hybrid => "hybrid",
        })
    }
}

/// Hybrid-mode knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridOptions {
    pub vector_weight: f32,
    pub graph_weight: f32,
    pub lexical_weight: f32,
    pub max_hops: usize,
    /// Also rank seed hits that mention entities in the graph list.
    pub boost_connected: bool,
}

impl Default for HybridOptions {
    fn default() -> Self {
        let weights = FusionWeights::default();
        Self {
            vector_weight: weights.vector_weight,
            graph_weight: weights.graph_weight,
            lexical_weight: weights.lexical_weight,
            max_hops: 2,
            boost_connected: true,
        }
    }
}

impl HybridOptions {
    pub fn weights(&self) -> FusionWeights {
        FusionWeights {
            vector_weight: self.vector_weight,
            graph_weight: self.graph_weight,
            lexical_weight: self.lexical_weight,
        }
    }
}

/// Inclusive bounds on a note's `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// One search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub mode: SearchMode,
    pub k: usize,
    #[serde(default)]
    pub model: ModelChoice,
    #[serde(default)]
    pub hybrid: Option<HybridOptions>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: SearchMode::default(),
            k: 10,
            model: ModelChoice::Auto,
            hybrid: None,
            date_range: None,
        }
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn model(mut self, model: ModelChoice) -> Self {
        self.model = model;
        self
    }

    pub fn hybrid(mut self, options: HybridOptions) -> Self {
        self.hybrid = Some(options);
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: String,
    pub title: String,
    pub snippet: String,
    pub score: f32,
    /// Matched entities for direct hits, connecting entities for expanded ones.
    pub entity_matches: Vec<String>,
    /// Found only through entity links.
    pub graph_expanded: bool,
    pub signals: SignalBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_distance: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub total_results: usize,
    pub search_time_ms: u64,
    /// Model tier whose embedding was used, if any.
    pub model_used: Option<String>,
    /// Graph expansion contributed at least one result.
    pub graph_expanded: bool,
    /// Signals that contributed a ranked list.
    pub signals: Vec<Signal>,
    pub warnings: Vec<String>,
    /// An auxiliary signal was requested but unavailable.
    pub degraded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub metadata: SearchMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_range_inclusive() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let range = DateRange {
            start: Some(day(2)),
            end: Some(day(4)),
        };
        assert!(!range.contains(day(1)));
        assert!(range.contains(day(2)));
        assert!(range.contains(day(4)));
        assert!(!range.contains(day(5)));
        assert!(DateRange::default().contains(day(1)));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Hybrid".parse::<SearchMode>().unwrap(), SearchMode::Hybrid);
        assert!("fuzzy".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_builder() {
        let request = SearchRequest::new("jon")
            .mode(SearchMode::Lexical)
            .k(3)
            .model(ModelChoice::Small);
        assert_eq!(request.k, 3);
        assert_eq!(request.mode, SearchMode::Lexical);
        assert!(request.hybrid.is_none());
    }

    #[test]
    fn test_response_json_shape() {
        let hit = SearchHit {
            document_id: "doc1".to_string(),
            title: "Jon Snow".to_string(),
            snippet: "Jon Snow".to_string(),
            score: 1.0,
            entity_matches: vec!["Jon".to_string()],
            graph_expanded: false,
            signals: SignalBreakdown::default(),
            graph_distance: None,
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["document_id"], "doc1");
        assert!(json.get("graph_distance").is_none());
    }
}
