//! Weighted Reciprocal Rank Fusion

use super::types::{
    CandidateResult, FusionWeights, RankedResult, Signal, SignalBreakdown, SignalEntry,
};
use super::FusionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for fusion algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// RRF K constant (typically 60)
    pub rrf_k: f32,
    pub weights: FusionWeights,
    /// Min-max normalize final scores into `[0, 1]`.
    pub normalize: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            weights: FusionWeights::default(),
            normalize: true,
        }
    }
}

/// Ranked lists to fuse, one per signal. An empty list means the signal did
/// not contribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalLists<'a> {
    pub lexical: &'a [SignalEntry],
    pub vector: &'a [SignalEntry],
    pub graph: &'a [SignalEntry],
}

impl<'a> SignalLists<'a> {
    fn get(&self, signal: Signal) -> &'a [SignalEntry] {
        match signal {
            Signal::Lexical => self.lexical,
            Signal::Vector => self.vector,
            Signal::Graph => self.graph,
        }
    }
}

/// Per-signal ranking of one list.
struct SignalRanking<'a> {
    ranks: HashMap<&'a str, usize>,
    scores: HashMap<&'a str, f32>,
    /// Rank given to documents absent from the list.
    missing_rank: usize,
}

fn rank_signal(entries: &[SignalEntry]) -> SignalRanking<'_> {
    let mut order: Vec<&SignalEntry> = Vec::with_capacity(entries.len());
    let mut scores = HashMap::with_capacity(entries.len());
    for entry in entries {
        // first occurrence wins for duplicate ids
        if !scores.contains_key(entry.document_id.as_str()) {
            scores.insert(entry.document_id.as_str(), entry.score);
            order.push(entry);
        }
    }

    // stable: equal scores keep input order
    order.sort_by(|a, b| b.score.total_cmp(&a.score));

    let ranks: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, entry)| (entry.document_id.as_str(), i + 1))
        .collect();

    SignalRanking {
        missing_rank: ranks.len() + 1,
        ranks,
        scores,
    }
}

/// Fuse per-signal rankings with weighted RRF.
///
/// score(d) = Σ weight_s / (rank_s(d) + k), where a document missing from a
/// non-empty list takes that list's worst rank + 1.
///
/// # Arguments
/// * `lists` - Ranked entries per signal
/// * `config` - RRF constant, weights and normalization
///
/// # Returns
/// Results sorted by fused score descending; ties keep first-seen order
/// (lexical, then vector, then graph list).
pub fn fuse(lists: SignalLists<'_>, config: &FusionConfig) -> Result<Vec<RankedResult>, FusionError> {
    config.weights.validate()?;
    if !config.rrf_k.is_finite() || config.rrf_k < 0.0 {
        return Err(FusionError::InvalidConstant(config.rrf_k));
    }

    let mut universe: Vec<&str> = Vec::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for signal in Signal::ALL {
        for entry in lists.get(signal) {
            let id = entry.document_id.as_str();
            if !first_seen.contains_key(id) {
                first_seen.insert(id, universe.len());
                universe.push(id);
            }
        }
    }

    let rankings: Vec<(Signal, SignalRanking<'_>)> = Signal::ALL
        .into_iter()
        .filter(|signal| !lists.get(*signal).is_empty())
        .map(|signal| (signal, rank_signal(lists.get(signal))))
        .collect();

    let mut results: Vec<(usize, RankedResult)> = universe
        .iter()
        .map(|&id| {
            let mut fused = 0.0f32;
            let mut signals = SignalBreakdown::default();
            let mut ranks: [Option<usize>; 3] = [None; 3];

            for (signal, ranking) in &rankings {
                let rank = ranking.ranks.get(id).copied().unwrap_or(ranking.missing_rank);
                fused += config.weights.get(*signal) / (rank as f32 + config.rrf_k);
                if let Some(&score) = ranking.scores.get(id) {
                    signals.set(*signal, score);
                }
                ranks[signal_slot(*signal)] = Some(rank);
            }

            (
                first_seen[id],
                RankedResult {
                    candidate: CandidateResult {
                        document_id: id.to_string(),
                        score: fused,
                        signals,
                        graph_distance: None,
                        connected_entities: Vec::new(),
                    },
                    final_score: fused,
                    lexical_rank: ranks[signal_slot(Signal::Lexical)],
                    vector_rank: ranks[signal_slot(Signal::Vector)],
                    graph_rank: ranks[signal_slot(Signal::Graph)],
                },
            )
        })
        .collect();

    results.sort_by(|(order_a, a), (order_b, b)| {
        b.candidate
            .score
            .total_cmp(&a.candidate.score)
            .then(order_a.cmp(order_b))
    });

    let mut results: Vec<RankedResult> = results.into_iter().map(|(_, r)| r).collect();
    if config.normalize {
        min_max_normalize(&mut results);
    }
    Ok(results)
}

fn signal_slot(signal: Signal) -> usize {
    match signal {
        Signal::Lexical => 0,
        Signal::Vector => 1,
        Signal::Graph => 2,
    }
}

/// Rescale `final_score` into `[0, 1]`. If every score is equal, all map to 1.
pub fn min_max_normalize(results: &mut [RankedResult]) {
    let Some(first) = results.first() else {
        return;
    };
    let (min, max) = results.iter().fold(
        (first.candidate.score, first.candidate.score),
        |(min, max), r| (min.min(r.candidate.score), max.max(r.candidate.score)),
    );
    let range = max - min;
    for result in results.iter_mut() {
        result.final_score = if range > 0.0 {
            (result.candidate.score - min) / range
        } else {
            1.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(items: &[(&str, f32)]) -> Vec<SignalEntry> {
        items
            .iter()
            .map(|(id, score)| SignalEntry::new(*id, *score))
            .collect()
    }

    fn ids(results: &[RankedResult]) -> Vec<&str> {
        results.iter().map(|r| r.document_id()).collect()
    }

    fn config(vector: f32, graph: f32, lexical: f32) -> FusionConfig {
        FusionConfig {
            weights: FusionWeights::new(vector, graph, lexical).unwrap(),
            ..FusionConfig::default()
        }
    }

    #[test]
    fn test_rrf_basic() {
        let lexical = entries(&[("1", 9.0), ("2", 8.0), ("3", 7.0)]);
        let vector = entries(&[("2", 0.95), ("1", 0.85), ("4", 0.75)]);

        let fused = fuse(
            SignalLists {
                lexical: &lexical,
                vector: &vector,
                graph: &[],
            },
            &config(1.0, 0.0, 1.0),
        )
        .unwrap();

        assert_eq!(fused.len(), 4);
        // 1 and 2 appear high in both lists
        assert!(fused[0].document_id() == "1" || fused[0].document_id() == "2");
        assert_eq!(fused[0].final_score, 1.0);
        assert_eq!(fused[3].final_score, 0.0);
    }

    #[test]
    fn test_pure_vector_weight_reproduces_vector_order() {
        let lexical = entries(&[("c", 5.0), ("a", 4.0), ("x", 3.0)]);
        let vector = entries(&[("b", 0.6), ("a", 0.9), ("c", 0.7), ("d", 0.1)]);
        let graph = entries(&[("d", 1.0), ("c", 0.5)]);

        let fused = fuse(
            SignalLists {
                lexical: &lexical,
                vector: &vector,
                graph: &graph,
            },
            &config(1.0, 0.0, 0.0),
        )
        .unwrap();

        assert_eq!(&ids(&fused)[..4], &["a", "c", "b", "d"]);
        assert_eq!(fused[0].vector_rank, Some(1));
        assert_eq!(fused[4].document_id(), "x");
        assert_eq!(fused[4].vector_rank, Some(5));
    }

    #[test]
    fn test_missing_document_gets_worst_rank_plus_one() {
        let lexical = entries(&[("a", 3.0), ("b", 2.0)]);
        let vector = entries(&[("c", 0.9)]);

        let cfg = FusionConfig {
            normalize: false,
            ..config(1.0, 0.0, 1.0)
        };
        let fused = fuse(
            SignalLists {
                lexical: &lexical,
                vector: &vector,
                graph: &[],
            },
            &cfg,
        )
        .unwrap();

        let c = fused.iter().find(|r| r.document_id() == "c").unwrap();
        assert_eq!(c.lexical_rank, Some(3));
        assert_eq!(c.vector_rank, Some(1));
        let expected = 1.0 / (3.0 + 60.0) + 1.0 / (1.0 + 60.0);
        assert!((c.candidate.score - expected).abs() < 1e-7);
        assert_eq!(c.final_score, c.candidate.score);
        assert_eq!(c.candidate.signals.lexical, None);
        assert_eq!(c.candidate.signals.vector, Some(0.9));
        assert!(c.graph_rank.is_none());
    }

    #[test]
    fn test_equal_scores_normalize_to_one() {
        let lexical = entries(&[("a", 1.0)]);
        let fused = fuse(
            SignalLists {
                lexical: &lexical,
                ..SignalLists::default()
            },
            &FusionConfig::default(),
        )
        .unwrap();
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].final_score, 1.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let lexical = entries(&[("z", 1.0), ("y", 1.0), ("x", 1.0)]);
        let fused = fuse(
            SignalLists {
                lexical: &lexical,
                ..SignalLists::default()
            },
            &FusionConfig::default(),
        )
        .unwrap();
        assert_eq!(ids(&fused), vec!["z", "y", "x"]);
    }

    #[test]
    fn test_duplicate_entries_use_first() {
        let vector = entries(&[("a", 0.9), ("b", 0.8), ("a", 0.1)]);
        let fused = fuse(
            SignalLists {
                vector: &vector,
                ..SignalLists::default()
            },
            &FusionConfig::default(),
        )
        .unwrap();
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].candidate.signals.vector, Some(0.9));
    }

    #[test]
    fn test_empty_lists() {
        let fused = fuse(SignalLists::default(), &FusionConfig::default()).unwrap();
        assert!(fused.is_empty());
    }

    #[test]
    fn test_invalid_weights() {
        assert!(FusionWeights::new(-1.0, 0.0, 1.0).is_err());
        assert!(FusionWeights::new(0.0, 0.0, 0.0).is_err());
        assert!(FusionWeights::new(f32::NAN, 1.0, 1.0).is_err());

        let cfg = FusionConfig {
            rrf_k: -5.0,
            ..FusionConfig::default()
        };
        assert!(matches!(
            fuse(SignalLists::default(), &cfg),
            Err(FusionError::InvalidConstant(_))
        ));
    }

    #[test]
    fn test_weights_normalized_for_display() {
        let w = FusionWeights::new(2.0, 1.0, 1.0).unwrap().normalized();
        assert!((w.vector_weight - 0.5).abs() < 1e-6);
        assert!((w.graph_weight - 0.25).abs() < 1e-6);
    }
}
