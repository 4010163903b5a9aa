//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] carries the tuning knobs, [`VectorIndex`] owns the nodes,
//! the live-id table and the per-instance scratch pool.

use super::distance::DistanceMetric;
use super::pool::ScratchPool;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::storage::SnapshotError;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Invalid index configuration: {0}")]
    InvalidConfig(String),

    #[error("Index capacity exceeded ({0} nodes)")]
    CapacityExceeded(usize),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Configuration parameters for an HNSW index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Maximum links per node above layer 0.
    pub m: usize,
    /// Maximum links per node at layer 0 (typically `2 * m`).
    pub m_max0: usize,
    /// Beam width while inserting.
    pub ef_construction: usize,
    /// Default beam width while searching (raised to `k` when smaller).
    pub ef_search: usize,
    /// Hard cap on assigned levels.
    pub max_level: usize,
    pub metric: DistanceMetric,
    /// Fixed RNG seed for reproducible level assignment.
    pub seed: Option<u64>,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m_max0: 32,
            ef_construction: 200,
            ef_search: 64,
            max_level: 16,
            metric: DistanceMetric::Cosine,
            seed: None,
        }
    }
}

impl HnswConfig {
    pub(crate) fn validate(&self) -> Result<(), VectorIndexError> {
        if self.m < 2 {
            return Err(VectorIndexError::InvalidConfig(format!(
                "m must be at least 2, got {}",
                self.m
            )));
        }
        if self.m_max0 < self.m {
            return Err(VectorIndexError::InvalidConfig(format!(
                "m_max0 ({}) must be >= m ({})",
                self.m_max0, self.m
            )));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(VectorIndexError::InvalidConfig(
                "ef_construction and ef_search must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `1 / ln(M)`, the scale of the exponential level distribution.
    pub fn level_multiplier(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }
}

/// One indexed vector and its per-level adjacency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorNode {
    pub id: String,
    pub vector: Vec<f32>,
    /// Cached Euclidean norm, reused by every cosine comparison.
    pub magnitude: f32,
    pub level: usize,
    /// `neighbors[l]` holds slot numbers at layer `l`, closest first.
    pub neighbors: Vec<Vec<u32>>,
    /// Tombstone: still navigable, never returned.
    pub deleted: bool,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    /// Metric distance (lower is closer).
    pub distance: f32,
    /// Similarity-shaped score derived from `distance` (higher is closer).
    pub similarity: f32,
}

/// In-memory HNSW approximate nearest-neighbor index.
///
/// Not safe for concurrent mutation; callers share it behind a lock with a
/// single writer.
pub struct VectorIndex {
    pub(crate) config: HnswConfig,
    pub(crate) dimension: usize,
    pub(crate) nodes: Vec<VectorNode>,
    /// Live id -> slot. Tombstoned slots are absent.
    pub(crate) slots: HashMap<String, u32>,
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_level: usize,
    pub(crate) rng: StdRng,
    pub(crate) pool: ScratchPool,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimension", &self.dimension)
            .field("live", &self.slots.len())
            .field("tombstones", &self.tombstone_count())
            .field("max_level", &self.max_level)
            .finish()
    }
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize, config: HnswConfig) -> Result<Self, VectorIndexError> {
        if dimension == 0 {
            return Err(VectorIndexError::InvalidConfig(
                "dimension must be greater than 0".to_string(),
            ));
        }
        config.validate()?;
        let rng = seeded_rng(config.seed);

        Ok(Self {
            config,
            dimension,
            nodes: Vec::new(),
            slots: HashMap::new(),
            entry_point: None,
            max_level: 0,
            rng,
            pool: ScratchPool::default(),
        })
    }

    /// Number of live (non-tombstoned) vectors.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Nodes kept in the graph only as tombstones.
    pub fn tombstone_count(&self) -> usize {
        self.nodes.len() - self.slots.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Live ids in slot order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes
            .iter()
            .filter(|n| !n.deleted)
            .map(|n| n.id.as_str())
    }

    pub fn entry_point_id(&self) -> Option<&str> {
        self.entry_point
            .map(|slot| self.nodes[slot as usize].id.as_str())
    }

    /// Stored vector for a live id.
    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.live_node(id).map(|n| n.vector.as_slice())
    }

    /// Assigned level for a live id.
    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.live_node(id).map(|n| n.level)
    }

    /// Neighbor ids of a live node at `level`, closest first. May include tombstones.
    pub fn neighbors(&self, id: &str, level: usize) -> Option<Vec<&str>> {
        let node = self.live_node(id)?;
        let layer = node.neighbors.get(level)?;
        Some(
            layer
                .iter()
                .map(|&slot| self.nodes[slot as usize].id.as_str())
                .collect(),
        )
    }

    /// Live ids present at `level` (every node exists at `0..=node.level`).
    pub fn ids_at_level(&self, level: usize) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| !n.deleted && n.level >= level)
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Link capacity at `level`.
    pub fn max_neighbors(&self, level: usize) -> usize {
        if level == 0 {
            self.config.m_max0
        } else {
            self.config.m
        }
    }

    /// Tombstone `id`. Neighbor lists are left intact; [`rebuild`](Self::rebuild)
    /// reclaims the slot. Returns `false` if the id is not live.
    pub fn delete(&mut self, id: &str) -> bool {
        match self.slots.remove(id) {
            Some(slot) => {
                self.tombstone(slot);
                tracing::debug!("Tombstoned vector {}", id);
                true
            }
            None => false,
        }
    }

    /// Drop every tombstone and reinsert the live vectors into a fresh graph.
    ///
    /// Returns the number of tombstones reclaimed.
    pub fn rebuild(&mut self) -> Result<usize, VectorIndexError> {
        let reclaimed = self.tombstone_count();
        let live: Vec<(String, Vec<f32>)> = std::mem::take(&mut self.nodes)
            .into_iter()
            .filter(|n| !n.deleted)
            .map(|n| (n.id, n.vector))
            .collect();

        self.slots.clear();
        self.entry_point = None;
        self.max_level = 0;

        for (id, vector) in live {
            self.insert_validated(id, &vector)?;
        }

        tracing::info!(
            "Rebuilt vector index: {} live vectors, {} tombstones reclaimed",
            self.len(),
            reclaimed
        );
        Ok(reclaimed)
    }

    pub(crate) fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
            return Err(VectorIndexError::InvalidVector(format!(
                "non-finite component at position {}",
                pos
            )));
        }
        Ok(())
    }

    /// Draw a level from `floor(-ln(U) * 1/ln(M))`, capped at `max_level`.
    pub(crate) fn random_level(&mut self) -> usize {
        // `random` is in [0, 1); flip it so ln never sees 0
        let uniform = 1.0 - self.rng.random::<f64>();
        let level = (-uniform.ln() * self.config.level_multiplier()).floor() as usize;
        level.min(self.config.max_level)
    }

    pub(crate) fn tombstone(&mut self, slot: u32) {
        self.nodes[slot as usize].deleted = true;
        if self.entry_point == Some(slot) {
            self.reassign_entry_point();
        }
    }

    /// Promote the highest-level live node (earliest slot on ties).
    fn reassign_entry_point(&mut self) {
        let mut best: Option<(usize, u32)> = None;
        for (slot, node) in self.nodes.iter().enumerate() {
            if node.deleted {
                continue;
            }
            if best.map_or(true, |(level, _)| node.level > level) {
                best = Some((node.level, slot as u32));
            }
        }

        match best {
            Some((level, slot)) => {
                self.entry_point = Some(slot);
                self.max_level = level;
            }
            None => {
                self.entry_point = None;
                self.max_level = 0;
            }
        }
    }

    fn live_node(&self, id: &str) -> Option<&VectorNode> {
        self.slots.get(id).map(|&slot| &self.nodes[slot as usize])
    }
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
