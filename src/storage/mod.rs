//! Storage layer for Resonance
//!
//! Index snapshots for warm starts. Entity mentions and co-occurrence edges
//! live in the graph store (see [`crate::graph::SqliteGraphStore`]).

pub mod snapshot;

pub use snapshot::{read_snapshot, write_snapshot, SnapshotError};
