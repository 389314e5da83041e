pub mod compress;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use std::path::Path;

/// Read a JSON document from a file, or from stdin when `path` is `-`.
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}
