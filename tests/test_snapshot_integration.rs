/// Snapshot integration tests
///
/// Index sets written by one orchestrator are served unchanged by another,
/// and snapshots that do not match the running configuration are refused.
use std::sync::Arc;
use tempfile::TempDir;

use resonance::embedding::{EmbeddingError, EmbeddingProvider, ModelSize};
use resonance::error::ResonanceError;
use resonance::search::{
    Note, OrchestratorSettings, SearchError, SearchIndexes, SearchMode, SearchOrchestrator,
    SearchRequest,
};
use resonance::vector::HnswConfig;

/// Letter-frequency embeddings of a configurable width.
struct LetterProvider {
    dimension: usize,
}

impl EmbeddingProvider for LetterProvider {
    fn embed(&self, text: &str, _model: ModelSize) -> Result<Vec<f32>, EmbeddingError> {
        let mut v = vec![0.0; self.dimension];
        for b in text.bytes().filter(u8::is_ascii_alphabetic) {
            v[(b.to_ascii_lowercase() - b'a') as usize % self.dimension] += 1.0;
        }
        Ok(v)
    }

    fn dimension(&self, model: ModelSize) -> Option<usize> {
        (model == ModelSize::Small).then_some(self.dimension)
    }

    fn model_name(&self, _model: ModelSize) -> Option<&str> {
        Some("letters")
    }
}

fn orchestrator(dimension: usize) -> SearchOrchestrator {
    let settings = OrchestratorSettings {
        hnsw: HnswConfig {
            seed: Some(5),
            ..HnswConfig::default()
        },
        ..OrchestratorSettings::default()
    };
    SearchOrchestrator::new(settings, Some(Arc::new(LetterProvider { dimension }))).unwrap()
}

fn corpus() -> Vec<Note> {
    vec![
        Note::new("winterfell", "Winterfell", "Seat of House Stark in the north"),
        Note::new("wall", "The Wall", "Ice and the Night's Watch"),
        Note::new("kings-landing", "King's Landing", "Capital of the Seven Kingdoms"),
        Note::new("dragonstone", "Dragonstone", "Island fortress of House Targaryen"),
    ]
}

#[tokio::test]
async fn test_snapshot_roundtrip_through_orchestrator() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("indexes.snap");

    let original = orchestrator(16);
    for note in corpus() {
        original.upsert_note(note).await.unwrap();
    }
    original.remove_note("kings-landing").await;
    let bytes = original.save_snapshot(&path).await.unwrap();
    assert!(bytes > 0);

    let restored = orchestrator(16);
    restored.load_snapshot(&path).await.unwrap();
    assert_eq!(original.stats().await, restored.stats().await);

    for mode in [SearchMode::Lexical, SearchMode::Semantic, SearchMode::Hybrid] {
        let request = SearchRequest::new("house stark north").mode(mode).k(3);
        let before = original.search(&request).await.unwrap();
        let after = restored.search(&request).await.unwrap();

        let ids = |r: &resonance::search::SearchResponse| -> Vec<(String, f32)> {
            r.results
                .iter()
                .map(|hit| (hit.document_id.clone(), hit.score))
                .collect()
        };
        assert_eq!(ids(&before), ids(&after), "mode {mode}");
        assert!(after
            .results
            .iter()
            .all(|hit| hit.document_id != "kings-landing"));
    }
}

#[tokio::test]
async fn test_snapshot_from_other_model_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("indexes.snap");

    let writer = orchestrator(16);
    for note in corpus() {
        writer.upsert_note(note).await.unwrap();
    }
    writer.save_snapshot(&path).await.unwrap();

    let reader = orchestrator(8);
    let result = reader.load_snapshot(&path).await;
    assert!(matches!(
        result,
        Err(ResonanceError::Search(SearchError::DimensionMismatch {
            expected: 8,
            actual: 16
        }))
    ));

    // the served indexes are untouched
    assert_eq!(reader.stats().await.notes, 0);
}

#[tokio::test]
async fn test_lexical_snapshot_gains_vector_index() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("indexes.snap");

    let lexical_only = SearchOrchestrator::new(OrchestratorSettings::default(), None).unwrap();
    for note in corpus() {
        lexical_only.upsert_note(note).await.unwrap();
    }
    lexical_only.save_snapshot(&path).await.unwrap();

    let loaded = SearchIndexes::load(&path).unwrap();
    assert_eq!(loaded.len(), 4);
    assert!(loaded.vector_models().is_empty());

    let with_vectors = orchestrator(16);
    with_vectors.load_snapshot(&path).await.unwrap();
    let stats = with_vectors.stats().await;
    assert_eq!(stats.notes, 4);
    assert_eq!(stats.vectors.len(), 1);
    assert_eq!(stats.vectors[0].live, 0);
}

#[tokio::test]
async fn test_corrupted_snapshot_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("indexes.snap");

    let writer = orchestrator(16);
    writer
        .upsert_note(Note::new("a", "Winterfell", "North"))
        .await
        .unwrap();
    writer.save_snapshot(&path).await.unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    let reader = orchestrator(16);
    assert!(reader.load_snapshot(&path).await.is_err());
    assert!(reader.load_snapshot(&temp.path().join("missing.snap")).await.is_err());
}
