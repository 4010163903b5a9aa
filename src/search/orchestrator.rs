//! Hybrid search combining lexical, semantic and graph signals

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::indexes::SearchIndexes;
use super::notes::Note;
use super::request::{
    HybridOptions, SearchHit, SearchMetadata, SearchMode, SearchRequest, SearchResponse,
};
use super::settings::OrchestratorSettings;
use super::snippet::make_snippet;
use super::SearchError;
use crate::embedding::{
    BatchIndexer, EmbeddingError, EmbeddingProvider, IndexingError, IndexingReport, ModelChoice,
    ModelSelector, ModelSize,
};
use crate::fusion::{fuse, FusionConfig, FusionWeights, Signal, SignalEntry, SignalLists};
use crate::graph::{ExpandedDocument, Expansion, GraphExpander};
use crate::lexical::Tokenizer;

/// Index sizes, for `stats` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub notes: usize,
    pub lexical_documents: usize,
    pub lexical_generation: u64,
    pub vectors: Vec<VectorStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorStats {
    pub model: ModelSize,
    pub dimension: usize,
    pub live: usize,
    pub tombstones: usize,
    pub max_level: usize,
}

/// Search orchestrator over a shared, swappable index set
///
/// Searches hold a read lock for their duration. Writers (note upserts,
/// snapshot loads, rebuild swaps) take the write lock briefly; embeddings and
/// bulk builds are computed before the lock is taken.
pub struct SearchOrchestrator {
    indexes: Arc<RwLock<SearchIndexes>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    expander: Option<GraphExpander>,
    selector: ModelSelector,
    settings: OrchestratorSettings,
}

impl SearchOrchestrator {
    /// Create an orchestrator with empty indexes
    ///
    /// # Arguments
    /// * `settings` - Scoring, fusion and search defaults
    /// * `provider` - Embedding provider; `None` limits search to lexical
    ///   and graph signals
    pub fn new(
        settings: OrchestratorSettings,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self, SearchError> {
        let indexes = SearchIndexes::for_provider(
            settings.lexical.clone(),
            &settings.hnsw,
            provider.as_deref(),
        )?;
        Ok(Self {
            indexes: Arc::new(RwLock::new(indexes)),
            provider,
            expander: None,
            selector: ModelSelector {
                long_query_words: settings.long_query_words,
            },
            settings,
        })
    }

    /// Enable graph expansion in hybrid searches.
    pub fn with_graph(mut self, expander: GraphExpander) -> Self {
        self.expander = Some(expander);
        self
    }

    /// Serve `indexes` instead of the empty set.
    pub fn with_indexes(self, indexes: SearchIndexes) -> Result<Self, SearchError> {
        let indexes = self.adopt(indexes)?;
        Ok(Self {
            indexes: Arc::new(RwLock::new(indexes)),
            ..self
        })
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn indexes(&self) -> Arc<RwLock<SearchIndexes>> {
        Arc::clone(&self.indexes)
    }

    /// Run one search.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let start = Instant::now();
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }
        if request.k == 0 {
            return Err(SearchError::InvalidQuery(
                "k must be greater than 0".to_string(),
            ));
        }
        if let Some(range) = &request.date_range {
            if let (Some(from), Some(to)) = (range.start, range.end) {
                if from > to {
                    return Err(SearchError::InvalidQuery(format!(
                        "Date range start {} is after end {}",
                        from, to
                    )));
                }
            }
        }
        let hybrid = request.hybrid.unwrap_or_else(|| self.default_hybrid());
        if request.mode == SearchMode::Hybrid {
            hybrid.weights().validate()?;
        }

        let mut metadata = SearchMetadata::default();

        // Step 1: Query embedding, before taking the index lock
        let embedding = if request.mode == SearchMode::Lexical {
            None
        } else {
            self.embed_query(query, request.model, &mut metadata).await?
        };
        let embed_ms = start.elapsed().as_millis();

        let indexes = self.indexes.read().await;
        if indexes.is_empty() {
            metadata.search_time_ms = start.elapsed().as_millis() as u64;
            return Ok(SearchResponse {
                results: Vec::new(),
                metadata,
            });
        }

        let date_range = request.date_range;
        let keep = |id: &str| {
            indexes.notes().get(id).is_some_and(|note| {
                date_range.map_or(true, |range| range.contains(note.updated_at))
            })
        };
        let candidate_k = request
            .k
            .saturating_mul(self.settings.search.candidate_multiplier.max(1));
        let fetch = if date_range.is_some() {
            candidate_k.saturating_mul(4)
        } else {
            candidate_k
        };
        let query_terms = indexes.lexical().config().tokenizer().tokenize_query(query);

        // Step 2: Lexical and vector candidates
        let lexical: Vec<SignalEntry> = if request.mode != SearchMode::Semantic || embedding.is_none()
        {
            indexes
                .lexical()
                .search(&query_terms, fetch)
                .into_iter()
                .filter(|m| keep(&m.doc_id))
                .take(candidate_k)
                .map(|m| SignalEntry::new(m.doc_id, m.score))
                .collect()
        } else {
            Vec::new()
        };

        let vector: Vec<SignalEntry> = match &embedding {
            Some((model, query_vector)) => match indexes.vector(*model) {
                Some(index) => index
                    .search(query_vector, fetch, index.config().ef_search.max(fetch))?
                    .into_iter()
                    .filter(|m| keep(&m.id))
                    .take(candidate_k)
                    .map(|m| SignalEntry::new(m.id, m.similarity))
                    .collect(),
                None => Vec::new(),
            },
            None => Vec::new(),
        };
        let retrieve_ms = start.elapsed().as_millis();

        // Step 3: Graph expansion from the best direct hits
        let mut expansion: Option<Expansion> = None;
        if request.mode == SearchMode::Hybrid && hybrid.max_hops > 0 && hybrid.graph_weight > 0.0 {
            if let Some(expander) = &self.expander {
                let seeds = select_seeds(
                    &lexical,
                    &vector,
                    self.settings.graph.seed_limit,
                    self.settings.graph.seed_min_similarity,
                );
                if !seeds.is_empty() {
                    let expander = expander.clone();
                    let options = self.settings.graph.expansion_options(hybrid.max_hops);
                    match tokio::task::spawn_blocking(move || expander.expand(&seeds, &options))
                        .await
                    {
                        Ok(result) => {
                            if result.degraded {
                                metadata.degraded = true;
                                metadata.warnings.push(
                                    "Graph store unavailable; results are not graph-expanded"
                                        .to_string(),
                                );
                            }
                            expansion = Some(result);
                        }
                        Err(e) => {
                            warn!("Graph expansion task failed: {}", e);
                            metadata.degraded = true;
                            metadata
                                .warnings
                                .push(format!("Graph expansion failed: {}", e));
                        }
                    }
                }
            }
        }

        let mut graph: Vec<SignalEntry> = Vec::new();
        let mut expanded: HashMap<&str, &ExpandedDocument> = HashMap::new();
        if let Some(expansion) = &expansion {
            for doc in &expansion.documents {
                if doc.graph_distance == 0 {
                    let mentions = expansion
                        .seed_entities
                        .get(&doc.document_id)
                        .map_or(0, Vec::len);
                    if !hybrid.boost_connected || mentions == 0 {
                        continue;
                    }
                } else {
                    if !keep(&doc.document_id) {
                        continue;
                    }
                    expanded.insert(doc.document_id.as_str(), doc);
                }
                graph.push(SignalEntry::new(
                    doc.document_id.clone(),
                    1.0 / (1.0 + doc.graph_distance as f32),
                ));
            }
        }
        let graph_ms = start.elapsed().as_millis();

        // Step 4: Reciprocal Rank Fusion
        let weights = match request.mode {
            SearchMode::Hybrid => hybrid.weights(),
            SearchMode::Semantic if !vector.is_empty() => single_signal(Signal::Vector),
            SearchMode::Semantic | SearchMode::Lexical => single_signal(Signal::Lexical),
        };
        let fusion = FusionConfig {
            weights,
            ..self.settings.fusion.clone()
        };
        let fused = fuse(
            SignalLists {
                lexical: &lexical,
                vector: &vector,
                graph: &graph,
            },
            &fusion,
        )?;

        // Step 5: Hydrate
        let lexical_ids: HashSet<&str> = lexical.iter().map(|e| e.document_id.as_str()).collect();
        let vector_ids: HashSet<&str> = vector.iter().map(|e| e.document_id.as_str()).collect();
        let query_set: HashSet<&str> = query_terms.iter().map(String::as_str).collect();
        let entity_tokenizer = Tokenizer::new(false);
        let width = self.settings.search.snippet_width;

        let mut results = Vec::with_capacity(request.k.min(fused.len()));
        for ranked in fused {
            if results.len() == request.k {
                break;
            }
            let id = ranked.document_id();
            let Some(note) = indexes.notes().get(id) else {
                continue;
            };

            let (entity_matches, graph_distance, graph_expanded) = match expanded.get(id) {
                Some(doc) => (
                    doc.connected_entities.clone(),
                    Some(doc.graph_distance),
                    !lexical_ids.contains(id) && !vector_ids.contains(id),
                ),
                None => {
                    let seed_entities = expansion
                        .as_ref()
                        .and_then(|e| e.seed_entities.get(id));
                    let matches = seed_entities
                        .map(|entities| {
                            entities
                                .iter()
                                .filter(|entity| {
                                    entity_tokenizer
                                        .tokenize(entity)
                                        .iter()
                                        .any(|t| query_set.contains(t.as_str()))
                                })
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default();
                    (matches, seed_entities.map(|_| 0), false)
                }
            };

            results.push(SearchHit {
                document_id: id.to_string(),
                title: note.title.clone(),
                snippet: make_snippet(&note.body, &query_terms, width),
                score: ranked.final_score,
                entity_matches,
                graph_expanded,
                signals: ranked.candidate.signals,
                graph_distance,
            });
        }

        metadata.total_results = results.len();
        metadata.graph_expanded = !expanded.is_empty();
        metadata.signals = [
            (Signal::Lexical, &lexical),
            (Signal::Vector, &vector),
            (Signal::Graph, &graph),
        ]
        .into_iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(signal, _)| signal)
        .collect();
        if vector.is_empty() {
            metadata.model_used = None;
        }
        metadata.search_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Search {:?} ({}): embed {}ms, retrieve {}ms, graph {}ms, total {}ms; {} lexical, {} vector, {} graph candidates",
            query,
            request.mode,
            embed_ms,
            retrieve_ms - embed_ms,
            graph_ms - retrieve_ms,
            metadata.search_time_ms,
            lexical.len(),
            vector.len(),
            graph.len()
        );

        Ok(SearchResponse { results, metadata })
    }

    fn default_hybrid(&self) -> HybridOptions {
        let weights = self.settings.fusion.weights;
        HybridOptions {
            vector_weight: weights.vector_weight,
            graph_weight: weights.graph_weight,
            lexical_weight: weights.lexical_weight,
            max_hops: self.settings.graph.max_hops,
            boost_connected: true,
        }
    }

    /// Embed the query with the selected model. Unavailability is recorded
    /// in `metadata` and yields `None`; a dimension mismatch is an error.
    async fn embed_query(
        &self,
        query: &str,
        choice: ModelChoice,
        metadata: &mut SearchMetadata,
    ) -> Result<Option<(ModelSize, Vec<f32>)>, SearchError> {
        let Some(provider) = &self.provider else {
            metadata.degraded = true;
            metadata.warnings.push(
                "No embedding provider configured; semantic signal skipped".to_string(),
            );
            return Ok(None);
        };

        let indexed = self.indexes.read().await.vector_models();
        let available: Vec<ModelSize> = provider
            .available_models()
            .into_iter()
            .filter(|m| indexed.contains(m))
            .collect();
        let Some(model) = self.selector.select(query, choice, &available) else {
            metadata.degraded = true;
            metadata
                .warnings
                .push("No embedding model available; semantic signal skipped".to_string());
            return Ok(None);
        };
        let requested = self.selector.preferred(query, choice);
        if choice != ModelChoice::Auto && requested != model {
            metadata.warnings.push(format!(
                "Requested {} model unavailable; used {}",
                requested, model
            ));
        }

        let worker = Arc::clone(provider);
        let text = query.to_string();
        let result = tokio::task::spawn_blocking(move || worker.embed(&text, model)).await;

        let failure = match result {
            Ok(Ok(vector)) => {
                metadata.model_used = Some(
                    provider
                        .model_name(model)
                        .map(str::to_string)
                        .unwrap_or_else(|| model.to_string()),
                );
                return Ok(Some((model, vector)));
            }
            Ok(Err(EmbeddingError::DimensionMismatch { expected, actual })) => {
                return Err(SearchError::DimensionMismatch { expected, actual });
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };

        warn!("Query embedding failed, falling back to lexical: {}", failure);
        metadata.degraded = true;
        metadata.warnings.push(format!(
            "Embedding failed ({}); semantic signal skipped",
            failure
        ));
        Ok(None)
    }

    /// Embed a note for every indexed model. Failures are logged and skipped.
    async fn embed_note(&self, note: &Note) -> Result<Vec<(ModelSize, Vec<f32>)>, SearchError> {
        let Some(provider) = &self.provider else {
            return Ok(Vec::new());
        };
        let text = note.embedding_text();
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let models = self.indexes.read().await.vector_models();
        let mut embeddings = Vec::with_capacity(models.len());
        for model in models {
            let worker = Arc::clone(provider);
            let text = text.clone();
            match tokio::task::spawn_blocking(move || worker.embed(&text, model)).await {
                Ok(Ok(vector)) => embeddings.push((model, vector)),
                Ok(Err(EmbeddingError::DimensionMismatch { expected, actual })) => {
                    return Err(SearchError::DimensionMismatch { expected, actual });
                }
                Ok(Err(e)) => warn!("Embedding failed for note {:?}: {}", note.id, e),
                Err(e) => warn!("Embedding task failed for note {:?}: {}", note.id, e),
            }
        }
        Ok(embeddings)
    }

    /// Insert or replace one note.
    pub async fn upsert_note(&self, note: Note) -> Result<(), SearchError> {
        let embeddings = self.embed_note(&note).await?;
        let id = note.id.clone();

        let mut indexes = self.indexes.write().await;
        indexes.upsert_note(note)?;
        for (model, vector) in embeddings {
            indexes.insert_embedding(model, &id, &vector)?;
        }
        debug!("Indexed note {:?}", id);
        Ok(())
    }

    /// Remove one note. Returns whether it was indexed.
    pub async fn remove_note(&self, id: &str) -> bool {
        self.indexes.write().await.remove_note(id)
    }

    /// Precompute IDF values so the first query does not pay for them.
    pub async fn warm(&self) {
        let mut indexes = self.indexes.write().await;
        indexes.lexical_mut().warm_idf_cache();
        info!("Warmed lexical index: {} documents", indexes.lexical().len());
    }

    /// Rebuild every index from `notes`, swapping the result in only when the
    /// build completes. On error or cancellation the served indexes are
    /// unchanged.
    pub async fn rebuild(
        &self,
        notes: Vec<Note>,
        cancel: &CancellationToken,
    ) -> Result<IndexingReport, IndexingError> {
        let indexer = BatchIndexer::new(
            self.provider.clone(),
            self.settings.lexical.clone(),
            self.settings.hnsw.clone(),
            self.settings.batch_size,
        );
        let (fresh, report) = indexer.build(notes, cancel).await?;

        *self.indexes.write().await = fresh;
        info!("Swapped in rebuilt indexes: {} notes", report.processed);
        Ok(report)
    }

    /// Reclaim tombstoned vector slots.
    pub async fn compact(&self) -> Result<usize, SearchError> {
        Ok(self.indexes.write().await.compact()?)
    }

    pub async fn save_snapshot(&self, path: &Path) -> crate::Result<u64> {
        self.indexes.read().await.save(path)
    }

    /// Replace the served indexes with a snapshot.
    pub async fn load_snapshot(&self, path: &Path) -> crate::Result<()> {
        let loaded = SearchIndexes::load(path)?;
        let loaded = self.adopt(loaded)?;
        *self.indexes.write().await = loaded;
        Ok(())
    }

    pub async fn stats(&self) -> IndexStats {
        let indexes = self.indexes.read().await;
        IndexStats {
            notes: indexes.len(),
            lexical_documents: indexes.lexical().len(),
            lexical_generation: indexes.lexical().generation(),
            vectors: indexes
                .vectors()
                .map(|(model, index)| VectorStats {
                    model,
                    dimension: index.dimension(),
                    live: index.len(),
                    tombstones: index.tombstone_count(),
                    max_level: index.max_level(),
                })
                .collect(),
        }
    }

    /// Check loaded vector indexes against the provider and add empty ones
    /// for provider models the snapshot lacks.
    fn adopt(&self, mut indexes: SearchIndexes) -> Result<SearchIndexes, SearchError> {
        let Some(provider) = &self.provider else {
            return Ok(indexes);
        };
        for model in provider.available_models() {
            let Some(dimension) = provider.dimension(model) else {
                continue;
            };
            match indexes.vector(model) {
                Some(index) if index.dimension() != dimension => {
                    return Err(SearchError::DimensionMismatch {
                        expected: dimension,
                        actual: index.dimension(),
                    });
                }
                Some(_) => {}
                None => indexes.add_vector_index(model, dimension, self.settings.hnsw.clone())?,
            }
        }
        Ok(indexes)
    }
}

fn single_signal(signal: Signal) -> FusionWeights {
    FusionWeights {
        vector_weight: if signal == Signal::Vector { 1.0 } else { 0.0 },
        graph_weight: if signal == Signal::Graph { 1.0 } else { 0.0 },
        lexical_weight: if signal == Signal::Lexical { 1.0 } else { 0.0 },
    }
}

/// Interleave the lexical and vector lists into at most `limit` seeds.
fn select_seeds(
    lexical: &[SignalEntry],
    vector: &[SignalEntry],
    limit: usize,
    min_similarity: f32,
) -> Vec<String> {
    let mut seeds = Vec::with_capacity(limit);
    let mut seen = HashSet::new();
    let mut lexical = lexical.iter();
    let mut vector = vector.iter().filter(|e| e.score >= min_similarity);

    while seeds.len() < limit {
        let next = [lexical.next(), vector.next()];
        if next.iter().all(Option::is_none) {
            break;
        }
        for entry in next.into_iter().flatten() {
            if seeds.len() < limit && seen.insert(entry.document_id.as_str()) {
                seeds.push(entry.document_id.clone());
            }
        }
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CooccurrenceGraph;

    fn entries(items: &[(&str, f32)]) -> Vec<SignalEntry> {
        items.iter().map(|(id, s)| SignalEntry::new(*id, *s)).collect()
    }

    #[test]
    fn test_select_seeds_interleaves() {
        let lexical = entries(&[("a", 3.0), ("b", 2.0), ("c", 1.0)]);
        let vector = entries(&[("b", 0.9), ("d", 0.8), ("e", 0.1)]);

        assert_eq!(select_seeds(&lexical, &vector, 4, 0.3), vec!["a", "b", "d", "c"]);
        assert_eq!(select_seeds(&lexical, &vector, 10, 0.3), vec!["a", "b", "d", "c"]);
        assert_eq!(select_seeds(&lexical, &vector, 1, 0.3), vec!["a"]);
        assert!(select_seeds(&[], &[], 5, 0.0).is_empty());
    }

    #[test]
    fn test_single_signal_weights() {
        let w = single_signal(Signal::Vector);
        assert_eq!((w.vector_weight, w.graph_weight, w.lexical_weight), (1.0, 0.0, 0.0));
        assert!(w.validate().is_ok());
    }

    fn lexical_only() -> SearchOrchestrator {
        SearchOrchestrator::new(OrchestratorSettings::default(), None).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_malformed_queries() {
        let orchestrator = lexical_only();
        assert!(matches!(
            orchestrator.search(&SearchRequest::new("  ")).await,
            Err(SearchError::InvalidQuery(_))
        ));
        assert!(matches!(
            orchestrator.search(&SearchRequest::new("jon").k(0)).await,
            Err(SearchError::InvalidQuery(_))
        ));

        let bad_weights = HybridOptions {
            vector_weight: -1.0,
            ..HybridOptions::default()
        };
        assert!(matches!(
            orchestrator
                .search(&SearchRequest::new("jon").hybrid(bad_weights))
                .await,
            Err(SearchError::Fusion(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty() {
        let orchestrator = lexical_only();
        let response = orchestrator
            .search(&SearchRequest::new("anything").mode(SearchMode::Lexical))
            .await
            .unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.metadata.total_results, 0);
    }

    #[tokio::test]
    async fn test_lexical_mode_with_snippet() {
        let orchestrator = lexical_only();
        orchestrator
            .upsert_note(Note::new("a", "Dragons", "The dragon flew over the wall at dawn"))
            .await
            .unwrap();
        orchestrator
            .upsert_note(Note::new("b", "Lemon cakes", "A recipe"))
            .await
            .unwrap();

        let response = orchestrator
            .search(&SearchRequest::new("wall").mode(SearchMode::Lexical))
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        let hit = &response.results[0];
        assert_eq!(hit.document_id, "a");
        assert_eq!(hit.title, "Dragons");
        assert!(hit.snippet.contains("wall"));
        assert_eq!(hit.score, 1.0);
        assert_eq!(response.metadata.signals, vec![Signal::Lexical]);
        assert!(!response.metadata.degraded);
    }

    #[tokio::test]
    async fn test_semantic_without_provider_falls_back() {
        let orchestrator = lexical_only();
        orchestrator
            .upsert_note(Note::new("a", "Jon", "Snow"))
            .await
            .unwrap();

        let response = orchestrator
            .search(&SearchRequest::new("jon").mode(SearchMode::Semantic))
            .await
            .unwrap();
        assert_eq!(response.results[0].document_id, "a");
        assert!(response.metadata.degraded);
        assert!(!response.metadata.warnings.is_empty());
        assert!(response.metadata.model_used.is_none());
    }

    #[tokio::test]
    async fn test_graph_expansion_flags_linked_notes() {
        let mut graph = CooccurrenceGraph::new();
        graph.set_mentions("jon", ["Jon"]);
        graph.set_mentions("castle", ["Castle Black"]);
        graph.add_edge("Jon", "Castle Black", 3.0);

        let orchestrator = lexical_only().with_graph(GraphExpander::new(Arc::new(graph)));
        orchestrator
            .upsert_note(Note::new("jon", "Jon Snow", "Lord commander"))
            .await
            .unwrap();
        orchestrator
            .upsert_note(Note::new("castle", "Fortress", "Built of ice and stone"))
            .await
            .unwrap();

        let response = orchestrator.search(&SearchRequest::new("jon")).await.unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].document_id, "jon");
        assert_eq!(response.results[0].entity_matches, vec!["Jon"]);
        assert!(!response.results[0].graph_expanded);

        let castle = &response.results[1];
        assert_eq!(castle.document_id, "castle");
        assert!(castle.graph_expanded);
        assert_eq!(castle.graph_distance, Some(1));
        assert_eq!(castle.entity_matches, vec!["Castle Black"]);
        assert!(response.metadata.graph_expanded);
        assert!(response.metadata.signals.contains(&Signal::Graph));
    }

    #[tokio::test]
    async fn test_remove_and_stats() {
        let orchestrator = lexical_only();
        orchestrator
            .upsert_note(Note::new("a", "One", "first"))
            .await
            .unwrap();
        assert!(orchestrator.remove_note("a").await);
        assert!(!orchestrator.remove_note("a").await);

        let stats = orchestrator.stats().await;
        assert_eq!(stats.notes, 0);
        assert!(stats.vectors.is_empty());
    }
}
