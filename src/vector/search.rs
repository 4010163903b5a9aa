//! HNSW search: greedy descent through upper layers and beam search per layer.
//!
//! Tombstoned nodes are traversed for navigation but never enter a result set.

use super::distance::{magnitude, DistanceMetric};
use super::index::{VectorIndex, VectorIndexError, VectorMatch, VectorNode};
use super::pool::SearchScratch;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;

/// Distance from a query to a stored node.
#[inline]
pub(crate) fn node_distance(
    nodes: &[VectorNode],
    metric: DistanceMetric,
    query: &[f32],
    query_mag: f32,
    slot: u32,
) -> f32 {
    let node = &nodes[slot as usize];
    metric.distance(query, query_mag, &node.vector, node.magnitude)
}

/// Follow single best-neighbor steps at `layer` until no neighbor is closer.
pub(crate) fn greedy_descend(
    nodes: &[VectorNode],
    metric: DistanceMetric,
    query: &[f32],
    query_mag: f32,
    start: u32,
    layer: usize,
) -> u32 {
    let mut current = start;
    let mut current_dist = node_distance(nodes, metric, query, query_mag, current);

    loop {
        let mut improved = false;
        if let Some(layer_neighbors) = nodes[current as usize].neighbors.get(layer) {
            for &neighbor in layer_neighbors {
                let dist = node_distance(nodes, metric, query, query_mag, neighbor);
                if dist < current_dist {
                    current = neighbor;
                    current_dist = dist;
                    improved = true;
                }
            }
        }
        if !improved {
            return current;
        }
    }
}

/// Beam search over one layer.
///
/// Returns up to `ef` live nodes as `(distance, slot)`, closest first.
/// Expansion stops once the closest pending candidate is farther than the
/// worst kept result. Neighbors tied with the worst result are still
/// expanded so a run of identical vectors is walked through, not stopped at.
#[allow(clippy::too_many_arguments)]
pub(crate) fn search_layer(
    nodes: &[VectorNode],
    metric: DistanceMetric,
    query: &[f32],
    query_mag: f32,
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    scratch: &mut SearchScratch,
) -> Vec<(f32, u32)> {
    scratch.reset(nodes.len());

    for &ep in entry_points {
        if !scratch.visited.insert(ep) {
            continue;
        }
        let dist = node_distance(nodes, metric, query, query_mag, ep);
        scratch.candidates.push(Reverse((OrderedFloat(dist), ep)));
        if !nodes[ep as usize].deleted {
            scratch.results.push((OrderedFloat(dist), ep));
            if scratch.results.len() > ef {
                scratch.results.pop();
            }
        }
    }

    while let Some(Reverse((OrderedFloat(candidate_dist), candidate))) = scratch.candidates.pop()
    {
        if scratch.results.len() >= ef {
            if let Some(&(OrderedFloat(worst), _)) = scratch.results.peek() {
                if candidate_dist > worst {
                    break;
                }
            }
        }

        let Some(layer_neighbors) = nodes[candidate as usize].neighbors.get(layer) else {
            continue;
        };

        for &neighbor in layer_neighbors {
            if !scratch.visited.insert(neighbor) {
                continue;
            }

            let dist = node_distance(nodes, metric, query, query_mag, neighbor);
            let worst = scratch
                .results
                .peek()
                .map_or(f32::INFINITY, |&(OrderedFloat(d), _)| d);

            if scratch.results.len() < ef || dist <= worst {
                scratch.candidates.push(Reverse((OrderedFloat(dist), neighbor)));
                if !nodes[neighbor as usize].deleted {
                    scratch.results.push((OrderedFloat(dist), neighbor));
                    if scratch.results.len() > ef {
                        scratch.results.pop();
                    }
                }
            }
        }
    }

    let mut found: Vec<(f32, u32)> = scratch
        .results
        .drain()
        .map(|(OrderedFloat(dist), slot)| (dist, slot))
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    found
}

impl VectorIndex {
    /// k-nearest-neighbor search.
    ///
    /// Results are ordered by ascending distance. `ef_search` is raised to `k`
    /// when smaller. An empty index yields an empty result.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<VectorMatch>, VectorIndexError> {
        self.validate_vector(query)?;

        let Some(entry_point) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let metric = self.config.metric;
        let query_mag = magnitude(query);
        let ef = ef_search.max(k);

        let mut current = entry_point;
        for layer in (1..=self.max_level).rev() {
            current = greedy_descend(&self.nodes, metric, query, query_mag, current, layer);
        }

        let mut scratch = self.pool.acquire();
        let mut found = search_layer(
            &self.nodes,
            metric,
            query,
            query_mag,
            std::slice::from_ref(&current),
            ef,
            0,
            &mut scratch,
        );
        found.truncate(k);

        Ok(found
            .into_iter()
            .map(|(distance, slot)| VectorMatch {
                id: self.nodes[slot as usize].id.clone(),
                distance,
                similarity: metric.similarity(distance),
            })
            .collect())
    }

    /// Search with the configured default `ef_search`.
    pub fn search_default(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<VectorMatch>, VectorIndexError> {
        self.search(query, k, self.config.ef_search)
    }
}
