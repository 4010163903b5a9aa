//! Distance metrics for the vector index.
//!
//! All distances are "lower is closer". Cosine distance is `1 - similarity`
//! with similarity clamped to `[-1, 1]`; Euclidean distance is squared, which
//! preserves ordering without a `sqrt`.

use serde::{Deserialize, Serialize};

/// Distance metric used to compare vectors in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine distance: `1 - cosine_similarity`. Range: \[0, 2\].
    #[default]
    Cosine,
    /// Squared Euclidean distance (L2²). Range: \[0, ∞).
    Euclidean,
}

impl DistanceMetric {
    /// Distance between two vectors whose magnitudes are already known.
    #[inline]
    pub fn distance(&self, a: &[f32], a_mag: f32, b: &[f32], b_mag: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - cosine_with_magnitudes(a, a_mag, b, b_mag),
            DistanceMetric::Euclidean => euclidean_distance_sq(a, b),
        }
    }

    /// Map a distance back onto a "higher is better" similarity score.
    ///
    /// Cosine returns the similarity itself; Euclidean uses `1 / (1 + d²)`.
    #[inline]
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - distance,
            DistanceMetric::Euclidean => 1.0 / (1.0 + distance),
        }
    }
}

/// Euclidean norm of a vector.
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity, clamped to `[-1, 1]`. Zero vectors have similarity 0 with anything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_magnitudes(a, magnitude(a), b, magnitude(b))
}

/// Cosine similarity using cached magnitudes.
#[inline]
pub fn cosine_with_magnitudes(a: &[f32], a_mag: f32, b: &[f32], b_mag: f32) -> f32 {
    if a_mag == 0.0 || b_mag == 0.0 {
        return 0.0;
    }
    (dot(a, b) / (a_mag * b_mag)).clamp(-1.0, 1.0)
}

/// Squared Euclidean distance.
#[inline]
pub fn euclidean_distance_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_similarity_is_one() {
        let vectors = [
            vec![1.0, 2.0, 3.0],
            vec![-0.5, 0.25, 8.0],
            vec![1e-3, 1e-3, 1e-3],
            vec![1e6, -1e6, 3.0],
        ];
        for v in &vectors {
            let sim = cosine_similarity(v, v);
            assert!((sim - 1.0).abs() < 1e-6, "got {sim} for {v:?}");
        }
    }

    #[test]
    fn test_zero_vector_similarity() {
        let zero = vec![0.0; 4];
        assert_eq!(cosine_similarity(&zero, &[1.0, 2.0, 3.0, 4.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0, 3.0, 4.0], &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_similarity_clamped() {
        let a = vec![0.1f32; 384];
        let sim = cosine_similarity(&a, &a);
        assert!(sim <= 1.0);
        let neg: Vec<f32> = a.iter().map(|x| -x).collect();
        assert!(cosine_similarity(&a, &neg) >= -1.0);
    }

    #[test]
    fn test_opposite_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_similarity_transform() {
        let metric = DistanceMetric::Euclidean;
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        let d = metric.distance(&a, magnitude(&a), &b, magnitude(&b));
        assert_eq!(d, 25.0);
        assert!((metric.similarity(d) - 1.0 / 26.0).abs() < 1e-7);
        assert_eq!(metric.similarity(0.0), 1.0);
    }

    #[test]
    fn test_cosine_distance_range() {
        let metric = DistanceMetric::Cosine;
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        let d = metric.distance(&a, 1.0, &b, 1.0);
        assert!((d - 1.0).abs() < 1e-6);
        assert!((metric.similarity(d)).abs() < 1e-6);
    }
}
