//! Breadth-first expansion over the entity co-occurrence graph
//!
//! Seed documents resolve to the entities they mention. BFS from that entity
//! set discovers new entities hop by hop; documents mentioning a discovered
//! entity become expanded results at that entity's hop distance.

use super::store::{GraphError, GraphStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Traversal bounds for one expansion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpansionOptions {
    pub max_hops: usize,
    pub max_expanded: usize,
    /// Edges lighter than this are not followed.
    pub min_cooccurrence: f32,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_hops: 2,
            max_expanded: 20,
            min_cooccurrence: 1.0,
        }
    }
}

/// A document in an expansion result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedDocument {
    pub document_id: String,
    /// 0 for seeds, otherwise the hop count of the nearest connecting entity.
    pub graph_distance: usize,
    /// Entities that pulled this document in, nearest first. Empty for seeds.
    pub connected_entities: Vec<String>,
}

/// Output of [`GraphExpander::expand`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Seeds first (input order), then expanded documents by distance.
    pub documents: Vec<ExpandedDocument>,
    /// Entities mentioned by each seed document.
    pub seed_entities: HashMap<String, Vec<String>>,
    /// Newly discovered entity -> hop distance.
    pub entity_distances: HashMap<String, usize>,
    /// The store failed and only the seeds were returned.
    pub degraded: bool,
}

impl Expansion {
    /// Seeds only, each at distance 0.
    pub fn seeds_only(seeds: &[String]) -> Self {
        Self {
            documents: seeds
                .iter()
                .map(|id| ExpandedDocument {
                    document_id: id.clone(),
                    graph_distance: 0,
                    connected_entities: Vec::new(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Documents that were not seeds.
    pub fn expanded(&self) -> impl Iterator<Item = &ExpandedDocument> {
        self.documents.iter().filter(|d| d.graph_distance > 0)
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded().count()
    }
}

/// Graph expansion over a shared [`GraphStore`].
#[derive(Clone)]
pub struct GraphExpander {
    store: Arc<dyn GraphStore>,
}

impl GraphExpander {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Expand `seeds`, degrading to the bare seeds if the store fails.
    pub fn expand(&self, seeds: &[String], options: &ExpansionOptions) -> Expansion {
        let seeds = dedup(seeds);
        match self.try_expand(&seeds, options) {
            Ok(expansion) => expansion,
            Err(e) => {
                tracing::warn!("Graph expansion unavailable, returning seeds only: {}", e);
                Expansion {
                    degraded: true,
                    ..Expansion::seeds_only(&seeds)
                }
            }
        }
    }

    /// Expand `seeds`, surfacing store failures.
    pub fn try_expand(
        &self,
        seeds: &[String],
        options: &ExpansionOptions,
    ) -> Result<Expansion, GraphError> {
        let seeds = dedup(seeds);
        let mut expansion = Expansion::seeds_only(&seeds);
        if seeds.is_empty() {
            return Ok(expansion);
        }

        expansion.seed_entities = self.store.entities_for_documents(&seeds)?;
        if options.max_hops == 0 || options.max_expanded == 0 {
            return Ok(expansion);
        }

        let seed_entities: BTreeSet<String> = expansion
            .seed_entities
            .values()
            .flatten()
            .cloned()
            .collect();

        let mut visited: HashSet<String> = seed_entities.iter().cloned().collect();
        let mut frontier: Vec<String> = seed_entities.into_iter().collect();
        let mut distances: HashMap<String, usize> = HashMap::new();

        for hop in 1..=options.max_hops {
            if frontier.is_empty() {
                break;
            }
            let rows = self.store.neighbors(&frontier, options.min_cooccurrence)?;

            let mut next: BTreeSet<String> = BTreeSet::new();
            for row in rows {
                if row.weight < options.min_cooccurrence {
                    continue;
                }
                if visited.insert(row.target.clone()) {
                    distances.insert(row.target.clone(), hop);
                    next.insert(row.target);
                }
            }
            frontier = next.into_iter().collect();
        }

        if !distances.is_empty() {
            let reached: Vec<String> = {
                let mut entities: Vec<String> = distances.keys().cloned().collect();
                entities.sort();
                entities
            };
            let seed_set: HashSet<&str> = seeds.iter().map(String::as_str).collect();
            let mentions = self.store.documents_for_entities(&reached)?;

            let mut expanded: Vec<ExpandedDocument> = mentions
                .into_iter()
                .filter(|(doc, _)| !seed_set.contains(doc.as_str()))
                .filter_map(|(doc, entities)| {
                    let mut connected: Vec<(usize, String)> = entities
                        .into_iter()
                        .filter_map(|e| distances.get(&e).map(|&d| (d, e)))
                        .collect();
                    connected.sort();
                    connected.dedup();
                    let graph_distance = connected.first()?.0;
                    Some(ExpandedDocument {
                        document_id: doc,
                        graph_distance,
                        connected_entities: connected.into_iter().map(|(_, e)| e).collect(),
                    })
                })
                .collect();

            expanded.sort_by(|a, b| {
                a.graph_distance
                    .cmp(&b.graph_distance)
                    .then_with(|| b.connected_entities.len().cmp(&a.connected_entities.len()))
                    .then_with(|| a.document_id.cmp(&b.document_id))
            });
            expanded.truncate(options.max_expanded);

            tracing::debug!(
                "Graph expansion: {} seeds, {} entities reached, {} documents added",
                seeds.len(),
                distances.len(),
                expanded.len()
            );
            expansion.documents.extend(expanded);
        }

        expansion.entity_distances = distances;
        Ok(expansion)
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::cooccurrence::CooccurrenceGraph;
    use super::super::store::Adjacency;
    use super::*;

    struct FailingStore;

    impl GraphStore for FailingStore {
        fn entities_for_documents(
            &self,
            _: &[String],
        ) -> Result<HashMap<String, Vec<String>>, GraphError> {
            Err(GraphError::Unavailable("offline".to_string()))
        }

        fn neighbors(&self, _: &[String], _: f32) -> Result<Vec<Adjacency>, GraphError> {
            Err(GraphError::Unavailable("offline".to_string()))
        }

        fn documents_for_entities(
            &self,
            _: &[String],
        ) -> Result<HashMap<String, Vec<String>>, GraphError> {
            Err(GraphError::Unavailable("offline".to_string()))
        }
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// A -- B -- C chain: seed mentions A, target doc mentions C.
    fn chain_graph() -> CooccurrenceGraph {
        let mut graph = CooccurrenceGraph::new();
        graph.set_mentions("seed", ["A"]);
        graph.set_mentions("via_b", ["B"]);
        graph.set_mentions("via_c", ["C"]);
        graph.add_edge("A", "B", 2.0);
        graph.add_edge("B", "C", 2.0);
        graph
    }

    fn options(max_hops: usize) -> ExpansionOptions {
        ExpansionOptions {
            max_hops,
            max_expanded: 10,
            min_cooccurrence: 1.0,
        }
    }

    #[test]
    fn test_two_hop_target_needs_two_hops() {
        let expander = GraphExpander::new(Arc::new(chain_graph()));

        let two = expander.expand(&ids(&["seed"]), &options(2));
        let c = two
            .documents
            .iter()
            .find(|d| d.document_id == "via_c")
            .unwrap();
        assert_eq!(c.graph_distance, 2);
        assert_eq!(c.connected_entities, ids(&["C"]));

        let one = expander.expand(&ids(&["seed"]), &options(1));
        assert!(one.documents.iter().all(|d| d.document_id != "via_c"));
        let b = one
            .documents
            .iter()
            .find(|d| d.document_id == "via_b")
            .unwrap();
        assert_eq!(b.graph_distance, 1);
    }

    #[test]
    fn test_minimum_hop_distance_kept() {
        let mut graph = chain_graph();
        // shortcut A -- C makes C one hop away
        graph.add_edge("A", "C", 1.0);
        let expander = GraphExpander::new(Arc::new(graph));

        let expansion = expander.expand(&ids(&["seed"]), &options(3));
        assert_eq!(expansion.entity_distances["C"], 1);
        assert_eq!(expansion.entity_distances["B"], 1);
        assert!(!expansion.entity_distances.contains_key("A"));
    }

    #[test]
    fn test_weak_edges_not_followed() {
        let mut graph = chain_graph();
        graph.add_edge("A", "D", 0.5);
        graph.set_mentions("via_d", ["D"]);
        let expander = GraphExpander::new(Arc::new(graph));

        let expansion = expander.expand(&ids(&["seed"]), &options(2));
        assert!(expansion.documents.iter().all(|d| d.document_id != "via_d"));
    }

    #[test]
    fn test_seeds_first_and_excluded_from_expansion() {
        let mut graph = chain_graph();
        graph.set_mentions("seed2", ["B"]);
        let expander = GraphExpander::new(Arc::new(graph));

        let expansion = expander.expand(&ids(&["seed", "seed2", "seed"]), &options(2));
        assert_eq!(expansion.documents[0].document_id, "seed");
        assert_eq!(expansion.documents[1].document_id, "seed2");
        assert_eq!(expansion.documents[0].graph_distance, 0);
        assert_eq!(
            expansion
                .documents
                .iter()
                .filter(|d| d.document_id == "seed2")
                .count(),
            1
        );
        assert!(!expansion.degraded);
    }

    #[test]
    fn test_max_expanded_caps_results() {
        let mut graph = CooccurrenceGraph::new();
        graph.set_mentions("seed", ["hub"]);
        for i in 0..10 {
            let entity = format!("e{i}");
            graph.add_edge("hub", &entity, 1.0);
            graph.set_mentions(&format!("doc{i}"), [entity]);
        }
        let expander = GraphExpander::new(Arc::new(graph));

        let expansion = expander.expand(
            &ids(&["seed"]),
            &ExpansionOptions {
                max_hops: 1,
                max_expanded: 3,
                min_cooccurrence: 1.0,
            },
        );
        assert_eq!(expansion.expanded_count(), 3);
        assert_eq!(expansion.documents.len(), 4);
    }

    #[test]
    fn test_store_failure_degrades() {
        let expander = GraphExpander::new(Arc::new(FailingStore));
        let expansion = expander.expand(&ids(&["a", "b"]), &options(2));

        assert!(expansion.degraded);
        assert_eq!(expansion.documents.len(), 2);
        assert!(expansion.documents.iter().all(|d| d.graph_distance == 0));
        assert!(expander.try_expand(&ids(&["a"]), &options(2)).is_err());
    }

    #[test]
    fn test_zero_hops_returns_seeds() {
        let expander = GraphExpander::new(Arc::new(chain_graph()));
        let expansion = expander.expand(&ids(&["seed"]), &options(0));
        assert_eq!(expansion.documents.len(), 1);
        assert_eq!(expansion.seed_entities["seed"], ids(&["A"]));
    }
}
