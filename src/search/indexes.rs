//! The set of indexes one search runs against

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::notes::{Note, NoteStore};
use crate::embedding::{EmbeddingProvider, ModelSize};
use crate::error::{ResonanceError, Result};
use crate::lexical::{LexicalConfig, LexicalError, LexicalScorer};
use crate::storage::{read_snapshot, write_snapshot};
use crate::vector::{
    HnswConfig, VectorIndex, VectorIndexError, VectorIndexSnapshot, VectorIndexSnapshotRef,
};

const SNAPSHOT_VERSION: u32 = 1;

/// Notes plus their lexical index and one vector index per model tier.
///
/// Built and mutated by a single writer; searches take a shared borrow.
#[derive(Debug)]
pub struct SearchIndexes {
    notes: NoteStore,
    lexical: LexicalScorer,
    vectors: BTreeMap<ModelSize, VectorIndex>,
}

impl SearchIndexes {
    pub fn new(lexical: LexicalConfig) -> Self {
        Self {
            notes: NoteStore::new(),
            lexical: LexicalScorer::new(lexical),
            vectors: BTreeMap::new(),
        }
    }

    /// Empty indexes with a vector index for every tier `provider` serves.
    pub fn for_provider(
        lexical: LexicalConfig,
        hnsw: &HnswConfig,
        provider: Option<&dyn EmbeddingProvider>,
    ) -> std::result::Result<Self, VectorIndexError> {
        let mut indexes = Self::new(lexical);
        if let Some(provider) = provider {
            for model in provider.available_models() {
                if let Some(dimension) = provider.dimension(model) {
                    indexes.add_vector_index(model, dimension, hnsw.clone())?;
                }
            }
        }
        Ok(indexes)
    }

    pub fn add_vector_index(
        &mut self,
        model: ModelSize,
        dimension: usize,
        config: HnswConfig,
    ) -> std::result::Result<(), VectorIndexError> {
        self.vectors.insert(model, VectorIndex::new(dimension, config)?);
        Ok(())
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn lexical(&self) -> &LexicalScorer {
        &self.lexical
    }

    pub fn lexical_mut(&mut self) -> &mut LexicalScorer {
        &mut self.lexical
    }

    pub fn vector(&self, model: ModelSize) -> Option<&VectorIndex> {
        self.vectors.get(&model)
    }

    pub fn vector_models(&self) -> Vec<ModelSize> {
        self.vectors.keys().copied().collect()
    }

    pub fn vectors(&self) -> impl Iterator<Item = (ModelSize, &VectorIndex)> {
        self.vectors.iter().map(|(model, index)| (*model, index))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Store `note` and index its text. Stale vectors for the id are
    /// dropped; call [`Self::insert_embedding`] to add fresh ones.
    pub fn upsert_note(&mut self, note: Note) -> std::result::Result<(), LexicalError> {
        self.lexical.index_note(&note.id, &note.title, &note.body)?;
        for index in self.vectors.values_mut() {
            index.delete(&note.id);
        }
        self.notes.upsert(note);
        Ok(())
    }

    pub fn insert_embedding(
        &mut self,
        model: ModelSize,
        id: &str,
        embedding: &[f32],
    ) -> std::result::Result<(), VectorIndexError> {
        match self.vectors.get_mut(&model) {
            Some(index) => index.insert(id, embedding),
            None => Err(VectorIndexError::InvalidConfig(format!(
                "no vector index for the {} model",
                model
            ))),
        }
    }

    /// Remove a note from every index. Returns whether it was present.
    pub fn remove_note(&mut self, id: &str) -> bool {
        let mut removed = self.notes.remove(id).is_some();
        removed |= self.lexical.remove_document(id);
        for index in self.vectors.values_mut() {
            removed |= index.delete(id);
        }
        removed
    }

    /// Reclaim tombstoned vector slots. Returns the number reclaimed.
    pub fn compact(&mut self) -> std::result::Result<usize, VectorIndexError> {
        let mut reclaimed = 0;
        for index in self.vectors.values_mut() {
            reclaimed += index.rebuild()?;
        }
        Ok(reclaimed)
    }

    /// Write a checksummed snapshot of everything. Returns bytes written.
    pub fn save(&self, path: &Path) -> Result<u64> {
        let snapshot = SearchIndexesSnapshotRef {
            version: SNAPSHOT_VERSION,
            notes: &self.notes,
            lexical: &self.lexical,
            vectors: self
                .vectors
                .iter()
                .map(|(model, index)| (*model, index.snapshot_ref()))
                .collect(),
        };
        let written = write_snapshot(path, &snapshot)?;
        tracing::info!(
            "Saved index snapshot: {} notes, {} bytes -> {}",
            self.notes.len(),
            written,
            path.display()
        );
        Ok(written)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snapshot: SearchIndexesSnapshot = read_snapshot(path)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ResonanceError::Config(format!(
                "Unsupported index snapshot version {} in {}",
                snapshot.version,
                path.display()
            )));
        }

        let mut vectors = BTreeMap::new();
        for (model, index) in snapshot.vectors {
            vectors.insert(model, VectorIndex::from_snapshot(index)?);
        }

        let mut lexical = snapshot.lexical;
        lexical.warm_idf_cache();

        tracing::info!(
            "Loaded index snapshot: {} notes, {} vector indexes from {}",
            snapshot.notes.len(),
            vectors.len(),
            path.display()
        );
        Ok(Self {
            notes: snapshot.notes,
            lexical,
            vectors,
        })
    }
}

#[derive(Serialize)]
struct SearchIndexesSnapshotRef<'a> {
    version: u32,
    notes: &'a NoteStore,
    lexical: &'a LexicalScorer,
    vectors: Vec<(ModelSize, VectorIndexSnapshotRef<'a>)>,
}

#[derive(Deserialize)]
struct SearchIndexesSnapshot {
    version: u32,
    notes: NoteStore,
    lexical: LexicalScorer,
    vectors: Vec<(ModelSize, VectorIndexSnapshot)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn indexes() -> SearchIndexes {
        let mut indexes = SearchIndexes::new(LexicalConfig::default());
        let config = HnswConfig {
            seed: Some(7),
            ..HnswConfig::default()
        };
        indexes.add_vector_index(ModelSize::Small, 3, config).unwrap();
        indexes
    }

    #[test]
    fn test_upsert_drops_stale_vector() {
        let mut indexes = indexes();
        indexes.upsert_note(Note::new("a", "Alpha", "first")).unwrap();
        indexes
            .insert_embedding(ModelSize::Small, "a", &[1.0, 0.0, 0.0])
            .unwrap();
        assert!(indexes.vector(ModelSize::Small).unwrap().contains("a"));

        indexes.upsert_note(Note::new("a", "Alpha", "changed")).unwrap();
        assert!(!indexes.vector(ModelSize::Small).unwrap().contains("a"));
        assert_eq!(indexes.len(), 1);
    }

    #[test]
    fn test_missing_tier_rejected() {
        let mut indexes = indexes();
        assert!(indexes
            .insert_embedding(ModelSize::Medium, "a", &[1.0, 0.0, 0.0])
            .is_err());
    }

    #[test]
    fn test_remove_note() {
        let mut indexes = indexes();
        indexes.upsert_note(Note::new("a", "Alpha", "first")).unwrap();
        indexes
            .insert_embedding(ModelSize::Small, "a", &[1.0, 0.0, 0.0])
            .unwrap();

        assert!(indexes.remove_note("a"));
        assert!(!indexes.remove_note("a"));
        assert!(indexes.is_empty());
        assert!(indexes.lexical().is_empty());
        assert_eq!(indexes.compact().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("indexes.snap");

        let mut indexes = indexes();
        for (i, (title, v)) in [("Jon Snow", [1.0, 0.0, 0.0]), ("Wall", [0.0, 1.0, 0.0])]
            .iter()
            .enumerate()
        {
            let id = format!("n{i}");
            indexes.upsert_note(Note::new(&id, *title, "body")).unwrap();
            indexes.insert_embedding(ModelSize::Small, &id, v).unwrap();
        }
        indexes.remove_note("n1");
        indexes.save(&path).unwrap();

        let loaded = SearchIndexes::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.notes().get("n0"), indexes.notes().get("n0"));
        let vectors = loaded.vector(ModelSize::Small).unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors.tombstone_count(), 1);
        assert_eq!(vectors.get("n0"), Some(&[1.0, 0.0, 0.0][..]));
        assert!(loaded.lexical().idf_cache_is_warm());
        assert_eq!(loaded.lexical().search_text("jon", 5)[0].doc_id, "n0");
    }
}
