//! In-memory entity co-occurrence graph
//!
//! Every pair of distinct entities mentioned by the same document adds 1 to
//! the pair's edge weight. Explicit edges add their own weight on top.

use super::store::{canonical_pair, Adjacency, GraphError, GraphStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Co-occurrence graph backed by hash maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooccurrenceGraph {
    /// Document -> mentioned entities
    mentions: HashMap<String, BTreeSet<String>>,
    /// Entity -> documents mentioning it
    documents: HashMap<String, BTreeSet<String>>,
    /// Entity -> neighbor -> weight, stored in both directions
    edges: HashMap<String, HashMap<String, f32>>,
}

impl CooccurrenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entities a document mentions, updating derived edge weights.
    pub fn set_mentions<I, S>(&mut self, document_id: &str, entities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_document(document_id);

        let entities: BTreeSet<String> = entities
            .into_iter()
            .map(Into::into)
            .filter(|e: &String| !e.is_empty())
            .collect();
        if entities.is_empty() {
            return;
        }

        for entity in &entities {
            self.documents
                .entry(entity.clone())
                .or_default()
                .insert(document_id.to_string());
        }
        for_each_pair(&entities, |a, b| self.bump(a, b, 1.0));
        self.mentions.insert(document_id.to_string(), entities);
    }

    /// Forget a document's mentions and the edge weight they contributed.
    pub fn remove_document(&mut self, document_id: &str) -> bool {
        let Some(previous) = self.mentions.remove(document_id) else {
            return false;
        };

        for entity in &previous {
            if let Some(docs) = self.documents.get_mut(entity) {
                docs.remove(document_id);
                if docs.is_empty() {
                    self.documents.remove(entity);
                }
            }
        }
        for_each_pair(&previous, |a, b| self.bump(a, b, -1.0));
        true
    }

    /// Add `weight` to the undirected edge `a <-> b`.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f32) {
        if a == b || a.is_empty() || b.is_empty() || !(weight > 0.0) {
            return;
        }
        self.bump(a, b, weight);
    }

    pub fn edge_weight(&self, a: &str, b: &str) -> f32 {
        self.edges
            .get(a)
            .and_then(|n| n.get(b))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn document_count(&self) -> usize {
        self.mentions.len()
    }

    pub fn entity_count(&self) -> usize {
        self.documents.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashMap::len).sum::<usize>() / 2
    }

    fn bump(&mut self, a: &str, b: &str, delta: f32) {
        let (a, b) = canonical_pair(a, b);
        for (from, to) in [(a, b), (b, a)] {
            let neighbors = self.edges.entry(from.to_string()).or_default();
            let weight = neighbors.entry(to.to_string()).or_insert(0.0);
            *weight += delta;
            if *weight <= 0.0 {
                neighbors.remove(to);
                if neighbors.is_empty() {
                    self.edges.remove(from);
                }
            }
        }
    }
}

fn for_each_pair(entities: &BTreeSet<String>, mut f: impl FnMut(&str, &str)) {
    let list: Vec<&String> = entities.iter().collect();
    for (i, a) in list.iter().enumerate() {
        for b in &list[i + 1..] {
            f(a, b);
        }
    }
}

impl GraphStore for CooccurrenceGraph {
    fn entities_for_documents(
        &self,
        document_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphError> {
        Ok(document_ids
            .iter()
            .filter_map(|doc| {
                self.mentions
                    .get(doc)
                    .map(|entities| (doc.clone(), entities.iter().cloned().collect()))
            })
            .collect())
    }

    fn neighbors(
        &self,
        entity_ids: &[String],
        min_weight: f32,
    ) -> Result<Vec<Adjacency>, GraphError> {
        let mut rows = Vec::new();
        for source in entity_ids {
            if let Some(neighbors) = self.edges.get(source) {
                for (target, &weight) in neighbors {
                    if weight >= min_weight {
                        rows.push(Adjacency {
                            source: source.clone(),
                            target: target.clone(),
                            weight,
                        });
                    }
                }
            }
        }
        Ok(rows)
    }

    fn documents_for_entities(
        &self,
        entity_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>, GraphError> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for entity in entity_ids {
            if let Some(docs) = self.documents.get(entity) {
                for doc in docs {
                    result.entry(doc.clone()).or_default().push(entity.clone());
                }
            }
        }
        Ok(result)
    }
}
