#![allow(dead_code)]

use ganglion::compression::{MemoryItem, MemoryStructure};
use ganglion::vector::hnsw::HnswParams;
use ganglion::vector::persistence::StorePaths;
use ganglion::vector::{StoreOptions, VectorStore};
use std::path::Path;

pub const DIM: usize = 384;

/// Store options rooted in `dir`, 384 dimensions.
pub fn test_options(dir: &Path, capacity: usize) -> StoreOptions {
    StoreOptions {
        params: HnswParams {
            dimension: DIM,
            ..Default::default()
        },
        capacity,
        paths: StorePaths::in_dir(dir),
    }
}

/// Open a store in `dir` with room for 100 vectors.
pub fn test_store(dir: &Path) -> VectorStore {
    VectorStore::open(test_options(dir, 100))
}

/// Generate a deterministic 384-dim embedding with a spike at position `seed`.
/// Each seed produces a distinct, orthogonal vector.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[seed % DIM] = 1.0;
    v
}

/// A point on the first axis at `x`: squared distance to the origin is `x * x`.
pub fn axis_embedding(x: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[0] = x;
    v
}

/// Build a memory structure from a JSON object literal.
pub fn memory(value: serde_json::Value) -> MemoryStructure {
    MemoryStructure::from_value(value).unwrap()
}

pub fn item_field<'a>(items: &'a [MemoryItem], field: &str) -> Vec<&'a str> {
    items
        .iter()
        .filter_map(|item| item.0.get(field).and_then(|v| v.as_str()))
        .collect()
}
