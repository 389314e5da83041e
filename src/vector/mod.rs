//! Approximate nearest-neighbor store keyed by opaque string IDs.
//!
//! Leaves first: [`id_map`] assigns dense labels, [`hnsw`] indexes vectors under those
//! labels, [`persistence`] saves and restores both as one unit, and [`store`] puts a
//! lock and a lazily-initialized handle in front of all three.

pub mod hnsw;
pub mod id_map;
pub mod persistence;
pub mod store;

pub use store::{global, AddOutcome, LazyStore, SearchHit, StoreOptions, StoreStats, VectorStore};
