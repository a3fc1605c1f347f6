//! Local persistence for the knowledge graph.

mod triples;

pub use triples::{StoreError, TripleStore};
