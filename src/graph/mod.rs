//! Entity graph expansion
//!
//! Pulls in documents that are lexically and semantically distant from a query
//! but share entities with its best hits, within a bounded number of
//! co-occurrence hops.

pub mod cooccurrence;
pub mod expander;
pub mod sqlite;
pub mod store;

pub use cooccurrence::CooccurrenceGraph;
pub use expander::{ExpandedDocument, Expansion, ExpansionOptions, GraphExpander};
pub use sqlite::{GraphStats, SqliteGraphStore};
pub use store::{Adjacency, GraphError, GraphStore};
