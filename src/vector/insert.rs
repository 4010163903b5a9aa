//! HNSW insertion and neighbor selection.

use super::distance::{magnitude, DistanceMetric};
use super::index::{VectorIndex, VectorIndexError, VectorNode};
use super::search::{greedy_descend, search_layer};

impl VectorIndex {
    /// Insert or replace a vector.
    ///
    /// Re-inserting a live id tombstones the previous node first, so the id
    /// always resolves to the newest vector.
    pub fn insert(&mut self, id: impl Into<String>, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.validate_vector(vector)?;
        self.insert_validated(id.into(), vector)
    }

    pub(crate) fn insert_validated(
        &mut self,
        id: String,
        vector: &[f32],
    ) -> Result<(), VectorIndexError> {
        if self.nodes.len() >= u32::MAX as usize {
            return Err(VectorIndexError::CapacityExceeded(self.nodes.len()));
        }

        if let Some(previous) = self.slots.remove(&id) {
            self.tombstone(previous);
        }

        let slot = self.nodes.len() as u32;
        let level = self.random_level();
        self.nodes.push(VectorNode {
            id: id.clone(),
            vector: vector.to_vec(),
            magnitude: magnitude(vector),
            level,
            neighbors: vec![Vec::new(); level + 1],
            deleted: false,
        });
        self.slots.insert(id, slot);

        match self.entry_point {
            None => {
                self.entry_point = Some(slot);
                self.max_level = level;
            }
            Some(entry_point) => {
                self.connect(slot, entry_point);
                if level > self.max_level {
                    self.entry_point = Some(slot);
                    self.max_level = level;
                }
            }
        }

        Ok(())
    }

    /// Wire a freshly pushed node into every layer it shares with the graph.
    fn connect(&mut self, slot: u32, entry_point: u32) {
        let metric = self.config.metric;
        let node_level = self.nodes[slot as usize].level;
        let query = self.nodes[slot as usize].vector.clone();
        let query_mag = self.nodes[slot as usize].magnitude;

        let mut current = entry_point;
        for layer in (node_level + 1..=self.max_level).rev() {
            current = greedy_descend(&self.nodes, metric, &query, query_mag, current, layer);
        }

        let mut entry_points = vec![current];
        let scratch_pool = &self.pool;
        let mut scratch = scratch_pool.acquire();

        for layer in (0..=node_level.min(self.max_level)).rev() {
            let candidates = search_layer(
                &self.nodes,
                metric,
                &query,
                query_mag,
                &entry_points,
                self.config.ef_construction,
                layer,
                &mut scratch,
            );

            let capacity = if layer == 0 {
                self.config.m_max0
            } else {
                self.config.m
            };
            let selected = select_neighbors(&self.nodes, metric, slot, &candidates, capacity, None);
            self.nodes[slot as usize].neighbors[layer] = selected.clone();

            for &neighbor in &selected {
                add_back_link(&mut self.nodes, metric, neighbor, slot, layer, capacity);
            }

            if !candidates.is_empty() {
                entry_points = candidates.iter().map(|&(_, s)| s).collect();
            }
        }
    }
}

/// Distances at or below this count as the same point.
const DUPLICATE_DISTANCE: f32 = 1e-6;

/// Neighbor selection for `base`.
///
/// A diversity pass walks candidates closest first and keeps one only if it
/// is no nearer to an already kept neighbor than to the base; near-exact
/// copies of a kept neighbor are pruned. Remaining capacity is then filled
/// with the closest pruned candidates, `keep` first when it was pruned.
///
/// Equal distances are ordered by a per-base hash of the slot so that runs of
/// identical vectors spread their links instead of all pointing at the
/// oldest slots.
pub(crate) fn select_neighbors(
    nodes: &[VectorNode],
    metric: DistanceMetric,
    base: u32,
    candidates: &[(f32, u32)],
    capacity: usize,
    keep: Option<u32>,
) -> Vec<u32> {
    let mut ordered: Vec<(f32, u32)> = candidates
        .iter()
        .copied()
        .filter(|&(_, candidate)| candidate != base)
        .collect();
    ordered.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| tie_key(base, a.1).cmp(&tie_key(base, b.1)))
    });

    let mut selected: Vec<u32> = Vec::with_capacity(capacity);
    let mut pruned: Vec<u32> = Vec::new();

    for &(dist_to_base, candidate) in &ordered {
        if selected.len() >= capacity {
            break;
        }
        let c = &nodes[candidate as usize];
        let diverse = selected.iter().all(|&kept| {
            let k = &nodes[kept as usize];
            let dist_to_kept = metric.distance(&c.vector, c.magnitude, &k.vector, k.magnitude);
            dist_to_kept >= dist_to_base && dist_to_kept > DUPLICATE_DISTANCE
        });
        if diverse {
            selected.push(candidate);
        } else {
            pruned.push(candidate);
        }
    }

    if let Some(pos) = keep.and_then(|k| pruned.iter().position(|&p| p == k)) {
        let kept = pruned.remove(pos);
        pruned.insert(0, kept);
    }
    for candidate in pruned {
        if selected.len() >= capacity {
            break;
        }
        selected.push(candidate);
    }

    selected
}

/// SplitMix64 over the (base, candidate) pair.
#[inline]
fn tie_key(base: u32, candidate: u32) -> u64 {
    let mut x = (((base as u64) << 32) | candidate as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Link `neighbor -> slot` at `layer`, re-pruning the neighbor's list when it
/// overflows. Tombstoned links are dropped first during a prune, and `slot`
/// takes the first spare place if the diversity pass rejects it.
fn add_back_link(
    nodes: &mut [VectorNode],
    metric: DistanceMetric,
    neighbor: u32,
    slot: u32,
    layer: usize,
    capacity: usize,
) {
    let idx = neighbor as usize;
    if nodes[idx].neighbors[layer].contains(&slot) {
        return;
    }
    nodes[idx].neighbors[layer].push(slot);
    if nodes[idx].neighbors[layer].len() <= capacity {
        return;
    }

    let base = &nodes[idx];
    let candidates: Vec<(f32, u32)> = base.neighbors[layer]
        .iter()
        .filter(|&&n| !nodes[n as usize].deleted)
        .map(|&n| {
            let other = &nodes[n as usize];
            (
                metric.distance(&base.vector, base.magnitude, &other.vector, other.magnitude),
                n,
            )
        })
        .collect();
    let pruned = select_neighbors(nodes, metric, neighbor, &candidates, capacity, Some(slot));
    nodes[idx].neighbors[layer] = pruned;
}
