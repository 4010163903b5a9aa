//! Segment-mask proximity
//!
//! Every indexed term carries a bitmask of the positional segments it occurs
//! in. Terms whose masks share bits appear near each other. Both strategies
//! return an overlap ratio in `[0, 1]`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How matched query terms are compared for proximity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityStrategy {
    /// Every pair of matched terms, O(n²).
    Pairwise,
    /// One pass over a combined mask, O(n).
    Windowed,
    /// Pairwise up to the configured term cutoff, windowed above it.
    #[default]
    Auto,
}

impl ProximityStrategy {
    /// Resolve `Auto` for a given number of matched terms.
    pub fn resolve(self, matched_terms: usize, pairwise_cutoff: usize) -> ProximityStrategy {
        match self {
            ProximityStrategy::Auto if matched_terms <= pairwise_cutoff => {
                ProximityStrategy::Pairwise
            }
            ProximityStrategy::Auto => ProximityStrategy::Windowed,
            other => other,
        }
    }
}

impl FromStr for ProximityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pairwise" => Ok(ProximityStrategy::Pairwise),
            "windowed" => Ok(ProximityStrategy::Windowed),
            "auto" => Ok(ProximityStrategy::Auto),
            other => Err(format!("Unknown proximity strategy '{}'", other)),
        }
    }
}

/// Overlap ratio of `masks` under `strategy`. Fewer than two masks score 0.
pub fn proximity_score(masks: &[u32], strategy: ProximityStrategy, pairwise_cutoff: usize) -> f32 {
    if masks.len() < 2 {
        return 0.0;
    }
    match strategy.resolve(masks.len(), pairwise_cutoff) {
        ProximityStrategy::Windowed => windowed_overlap(masks),
        _ => pairwise_overlap(masks),
    }
}

/// Mean Jaccard overlap across all pairs.
pub fn pairwise_overlap(masks: &[u32]) -> f32 {
    let mut total = 0.0f32;
    let mut pairs = 0u32;
    for (i, &a) in masks.iter().enumerate() {
        for &b in &masks[i + 1..] {
            let union = (a | b).count_ones();
            if union > 0 {
                total += (a & b).count_ones() as f32 / union as f32;
            }
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f32
    }
}

/// Share of occupied segments that hold at least two of the terms.
pub fn windowed_overlap(masks: &[u32]) -> f32 {
    let mut seen = 0u32;
    let mut shared = 0u32;
    for &mask in masks {
        shared |= seen & mask;
        seen |= mask;
    }
    if seen == 0 {
        0.0
    } else {
        shared.count_ones() as f32 / seen.count_ones() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_segment_beats_different_segments() {
        let together = [0b0001, 0b0001];
        let apart = [0b0001, 0b1000];
        assert!(pairwise_overlap(&together) > pairwise_overlap(&apart));
        assert!(windowed_overlap(&together) > windowed_overlap(&apart));
        assert_eq!(pairwise_overlap(&apart), 0.0);
        assert_eq!(windowed_overlap(&together), 1.0);
    }

    #[test]
    fn test_single_mask_scores_zero() {
        assert_eq!(proximity_score(&[0b1], ProximityStrategy::Pairwise, 8), 0.0);
        assert_eq!(proximity_score(&[], ProximityStrategy::Windowed, 8), 0.0);
    }

    #[test]
    fn test_auto_cutoff() {
        assert_eq!(
            ProximityStrategy::Auto.resolve(8, 8),
            ProximityStrategy::Pairwise
        );
        assert_eq!(
            ProximityStrategy::Auto.resolve(9, 8),
            ProximityStrategy::Windowed
        );
        assert_eq!(
            ProximityStrategy::Windowed.resolve(2, 8),
            ProximityStrategy::Windowed
        );
    }

    #[test]
    fn test_partial_overlap() {
        // segments {0,1} and {1,2}: one shared of three occupied
        let masks = [0b011, 0b110];
        assert!((pairwise_overlap(&masks) - 1.0 / 3.0).abs() < 1e-6);
        assert!((windowed_overlap(&masks) - 1.0 / 3.0).abs() < 1e-6);
    }
}
