//! Snapshot save/load for [`VectorIndex`].

use super::index::{seeded_rng, HnswConfig, VectorIndex, VectorIndexError, VectorNode};
use super::pool::ScratchPool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::storage::{read_snapshot, write_snapshot};

/// Serialized form of a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexSnapshot {
    pub config: HnswConfig,
    pub dimension: usize,
    pub nodes: Vec<VectorNode>,
    pub entry_point: Option<u32>,
    pub max_level: usize,
}

/// Borrowed twin of [`VectorIndexSnapshot`] so saving never clones the graph.
/// Field order must match.
#[derive(Serialize)]
pub(crate) struct VectorIndexSnapshotRef<'a> {
    config: &'a HnswConfig,
    dimension: usize,
    nodes: &'a [VectorNode],
    entry_point: Option<u32>,
    max_level: usize,
}

impl VectorIndex {
    pub(crate) fn snapshot_ref(&self) -> VectorIndexSnapshotRef<'_> {
        VectorIndexSnapshotRef {
            config: &self.config,
            dimension: self.dimension,
            nodes: &self.nodes,
            entry_point: self.entry_point,
            max_level: self.max_level,
        }
    }

    /// Restore an index from a snapshot, checking its structural invariants.
    pub fn from_snapshot(snapshot: VectorIndexSnapshot) -> Result<Self, VectorIndexError> {
        snapshot.config.validate()?;
        let node_count = snapshot.nodes.len();
        let mut slots = HashMap::with_capacity(node_count);

        for (slot, node) in snapshot.nodes.iter().enumerate() {
            if node.vector.len() != snapshot.dimension {
                return Err(VectorIndexError::CorruptSnapshot(format!(
                    "node {} has dimension {}, expected {}",
                    node.id,
                    node.vector.len(),
                    snapshot.dimension
                )));
            }
            if node.neighbors.len() != node.level + 1 {
                return Err(VectorIndexError::CorruptSnapshot(format!(
                    "node {} has {} neighbor layers for level {}",
                    node.id,
                    node.neighbors.len(),
                    node.level
                )));
            }
            if node
                .neighbors
                .iter()
                .flatten()
                .any(|&n| n as usize >= node_count)
            {
                return Err(VectorIndexError::CorruptSnapshot(format!(
                    "node {} links past the end of the graph",
                    node.id
                )));
            }
            if !node.deleted && slots.insert(node.id.clone(), slot as u32).is_some() {
                return Err(VectorIndexError::CorruptSnapshot(format!(
                    "duplicate live id {}",
                    node.id
                )));
            }
        }

        match snapshot.entry_point {
            Some(ep) => {
                let node = snapshot.nodes.get(ep as usize).ok_or_else(|| {
                    VectorIndexError::CorruptSnapshot("entry point out of range".to_string())
                })?;
                if node.deleted || node.level != snapshot.max_level {
                    return Err(VectorIndexError::CorruptSnapshot(
                        "entry point is not a live node at the top level".to_string(),
                    ));
                }
            }
            None if !slots.is_empty() => {
                return Err(VectorIndexError::CorruptSnapshot(
                    "live nodes without an entry point".to_string(),
                ));
            }
            None => {}
        }

        let rng = seeded_rng(snapshot.config.seed);
        Ok(Self {
            config: snapshot.config,
            dimension: snapshot.dimension,
            nodes: snapshot.nodes,
            slots,
            entry_point: snapshot.entry_point,
            max_level: snapshot.max_level,
            rng,
            pool: ScratchPool::default(),
        })
    }

    /// Write the index to `path`. Returns the number of bytes written.
    pub fn save(&self, path: &Path) -> Result<u64, VectorIndexError> {
        let bytes = write_snapshot(path, &self.snapshot_ref())?;
        tracing::info!(
            "Saved vector index ({} vectors) to {}",
            self.len(),
            path.display()
        );
        Ok(bytes)
    }

    pub fn load(path: &Path) -> Result<Self, VectorIndexError> {
        let snapshot: VectorIndexSnapshot = read_snapshot(path)?;
        let index = Self::from_snapshot(snapshot)?;
        tracing::info!(
            "Loaded vector index ({} vectors) from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_index() -> VectorIndex {
        let config = HnswConfig {
            m: 4,
            m_max0: 8,
            seed: Some(9),
            ..HnswConfig::default()
        };
        let mut index = VectorIndex::new(3, config).unwrap();
        index.insert("north", &[1.0, 0.0, 0.0]).unwrap();
        index.insert("south", &[-1.0, 0.0, 0.0]).unwrap();
        index.insert("east", &[0.0, 1.0, 0.0]).unwrap();
        index.insert("up", &[0.0, 0.0, 1.0]).unwrap();
        index.delete("south");
        index
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vectors.snap");
        let index = small_index();

        index.save(&path).unwrap();
        let loaded = VectorIndex::load(&path).unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.tombstone_count(), 1);
        assert!(!loaded.contains("south"));
        assert_eq!(loaded.get("east"), Some(&[0.0, 1.0, 0.0][..]));
        assert_eq!(loaded.entry_point_id(), index.entry_point_id());

        let before = index.search(&[0.9, 0.1, 0.0], 3, 16).unwrap();
        let after = loaded.search(&[0.9, 0.1, 0.0], 3, 16).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_corrupt_links_rejected() {
        let index = small_index();
        let mut snapshot = VectorIndexSnapshot {
            config: index.config.clone(),
            dimension: index.dimension,
            nodes: index.nodes.clone(),
            entry_point: index.entry_point,
            max_level: index.max_level,
        };
        snapshot.nodes[0].neighbors[0].push(999);

        assert!(matches!(
            VectorIndex::from_snapshot(snapshot),
            Err(VectorIndexError::CorruptSnapshot(_))
        ));
    }
}
