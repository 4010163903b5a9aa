/// Bulk indexing: builds a fresh index set from a corpus in bounded batches
use super::{EmbeddingError, EmbeddingProvider, ModelSize};
use crate::lexical::LexicalConfig;
use crate::search::{Note, SearchIndexes};
use crate::vector::{HnswConfig, VectorIndexError};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Indexing cancelled after {processed} notes")]
    Cancelled { processed: usize },

    #[error("Indexing task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),
}

/// Result of a bulk indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingReport {
    /// Notes added to the new index set
    pub processed: usize,
    /// Notes rejected outright (for example an empty id)
    pub failed: usize,
    /// Notes indexed lexically but missing a vector for some model
    pub embedding_failures: usize,
    /// Notes with no text to embed, indexed lexically only
    pub skipped_empty: usize,
    pub duration_ms: u64,
}

/// Batch indexer for embedding generation and indexing
///
/// Every run builds a new [`SearchIndexes`]; nothing already being served is
/// touched, so a cancelled or failed run leaves the caller's indexes as they
/// were.
pub struct BatchIndexer {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    lexical: LexicalConfig,
    hnsw: HnswConfig,
    batch_size: usize,
}

impl BatchIndexer {
    /// Create a new batch indexer
    ///
    /// # Arguments
    /// * `provider` - Embedding provider, or `None` for a lexical-only build
    /// * `lexical` - Lexical scoring parameters of the new index
    /// * `hnsw` - Graph parameters of each new vector index
    /// * `batch_size` - Number of notes embedded per batch
    pub fn new(
        provider: Option<Arc<dyn EmbeddingProvider>>,
        lexical: LexicalConfig,
        hnsw: HnswConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            lexical,
            hnsw,
            batch_size: batch_size.max(1),
        }
    }

    /// Index `notes` into a fresh index set.
    ///
    /// Control is yielded to the runtime between batches. `cancel` is checked
    /// before each batch.
    pub async fn build(
        &self,
        notes: Vec<Note>,
        cancel: &CancellationToken,
    ) -> Result<(SearchIndexes, IndexingReport), IndexingError> {
        let start = std::time::Instant::now();
        let total = notes.len();
        info!("Starting bulk indexing of {} notes", total);

        let mut indexes = SearchIndexes::for_provider(
            self.lexical.clone(),
            &self.hnsw,
            self.provider.as_deref(),
        )?;
        let models = indexes.vector_models();
        let mut report = IndexingReport::default();

        for chunk in notes.chunks(self.batch_size) {
            if cancel.is_cancelled() {
                info!(
                    "Bulk indexing cancelled after {} of {} notes",
                    report.processed, total
                );
                return Err(IndexingError::Cancelled {
                    processed: report.processed,
                });
            }

            let mut accepted: Vec<&Note> = Vec::with_capacity(chunk.len());
            for note in chunk {
                match indexes.upsert_note(note.clone()) {
                    Ok(()) => accepted.push(note),
                    Err(e) => {
                        warn!("Skipping note {:?}: {}", note.id, e);
                        report.failed += 1;
                    }
                }
            }

            let blank: Vec<bool> = accepted
                .iter()
                .map(|n| n.embedding_text().trim().is_empty())
                .collect();
            let mut missing_vector = vec![false; accepted.len()];
            if let Some(provider) = &self.provider {
                for &model in &models {
                    let embedded = self.embed_chunk(provider, &accepted, model).await?;
                    for (i, embedding) in embedded.into_iter().enumerate() {
                        match embedding {
                            Some(vector) => {
                                indexes.insert_embedding(model, &accepted[i].id, &vector)?
                            }
                            None if blank[i] => {}
                            None => missing_vector[i] = true,
                        }
                    }
                }
            }

            report.processed += accepted.len();
            report.embedding_failures += missing_vector.iter().filter(|m| **m).count();
            if self.provider.is_some() {
                report.skipped_empty += blank.iter().filter(|b| **b).count();
            }
            debug!("Indexed batch of {} notes", accepted.len());

            tokio::task::yield_now().await;
        }

        indexes.lexical_mut().warm_idf_cache();
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Bulk indexing complete: {} processed, {} failed, {} without embeddings, {} empty, {}ms",
            report.processed,
            report.failed,
            report.embedding_failures,
            report.skipped_empty,
            report.duration_ms
        );
        Ok((indexes, report))
    }

    /// Embed one batch on a blocking thread. Entries are `None` for notes
    /// that have no text or whose embedding failed.
    async fn embed_chunk(
        &self,
        provider: &Arc<dyn EmbeddingProvider>,
        notes: &[&Note],
        model: ModelSize,
    ) -> Result<Vec<Option<Vec<f32>>>, IndexingError> {
        let texts: Vec<String> = notes.iter().map(|n| n.embedding_text()).collect();
        let ids: Vec<String> = notes.iter().map(|n| n.id.clone()).collect();
        let provider = Arc::clone(provider);

        let result = tokio::task::spawn_blocking(move || {
            let with_text: Vec<usize> = (0..texts.len())
                .filter(|&i| !texts[i].trim().is_empty())
                .collect();
            let batch: Vec<String> = with_text.iter().map(|&i| texts[i].clone()).collect();
            let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

            match provider.embed_batch(&batch, model) {
                Ok(embeddings) if embeddings.len() == batch.len() => {
                    for (i, embedding) in with_text.into_iter().zip(embeddings) {
                        out[i] = Some(embedding);
                    }
                    Ok(out)
                }
                Err(e @ EmbeddingError::DimensionMismatch { .. }) => Err(e),
                other => {
                    if let Err(e) = other {
                        warn!("Batch embedding failed, retrying notes one by one: {}", e);
                    }
                    for i in with_text {
                        match provider.embed(&texts[i], model) {
                            Ok(embedding) => out[i] = Some(embedding),
                            Err(e @ EmbeddingError::DimensionMismatch { .. }) => return Err(e),
                            Err(e) => warn!("Embedding failed for note {:?}: {}", ids[i], e),
                        }
                    }
                    Ok(out)
                }
            }
        })
        .await
        .map_err(|e| IndexingError::Task(e.to_string()))?;

        Ok(result?)
    }
}
