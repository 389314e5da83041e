use anyhow::{bail, Result};
use ganglion::config::GanglionConfig;
use ganglion::vector::{StoreOptions, VectorStore};
use std::path::Path;

/// Run a k-NN search from the terminal. The query is a JSON array of numbers.
pub fn search(config: &GanglionConfig, query: &Path, k: Option<usize>) -> Result<()> {
    let value = super::read_json(query)?;
    let vector: Vec<f32> = match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => bail!("query must be a JSON array of numbers: {e}"),
    };

    let store = VectorStore::open(StoreOptions::from_config(config));
    let k = k.unwrap_or(config.index.default_k);
    let hits = store.search(&vector, k)?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!("  {}. {} (distance: {:.6})", i + 1, hit.id, hit.distance);
    }

    Ok(())
}
