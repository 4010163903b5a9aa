//! Approximate nearest-neighbor search over note embeddings
//!
//! A Hierarchical Navigable Small World (HNSW) graph. Each node gets a random
//! level drawn from an exponential distribution; upper layers are sparse
//! express lanes, layer 0 holds every node. Deletion is a tombstone: deleted
//! nodes keep routing searches but never appear in results until
//! [`VectorIndex::rebuild`] compacts them away.

pub mod distance;
mod index;
mod insert;
mod persistence;
pub mod pool;
mod search;

pub use distance::{cosine_similarity, magnitude, DistanceMetric};
pub use index::{HnswConfig, VectorIndex, VectorIndexError, VectorMatch, VectorNode};
pub use persistence::VectorIndexSnapshot;
pub(crate) use persistence::VectorIndexSnapshotRef;
