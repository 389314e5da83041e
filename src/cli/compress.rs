//! CLI `compress` command: fit a memory JSON document into a byte budget.

use anyhow::{Context, Result};
use ganglion::compression::{self, CompressionStrategy, MemoryStructure};
use ganglion::config::GanglionConfig;
use std::path::Path;

/// Compress the memory document at `input` and print (or write) the compacted result.
pub fn compress(
    config: &GanglionConfig,
    input: &Path,
    strategy: Option<CompressionStrategy>,
    max_memory_size: Option<usize>,
    retention_threshold: Option<f64>,
    output: Option<&Path>,
) -> Result<()> {
    let memory = MemoryStructure::from_value(super::read_json(input)?)
        .context("memory document must be a JSON object")?;

    let strategy = strategy.unwrap_or(config.compression.default_strategy);
    let max_memory_size = max_memory_size.unwrap_or(config.compression.max_memory_size);
    let retention_threshold = retention_threshold.or(config.compression.retention_threshold);

    let result = compression::compress(memory, strategy, retention_threshold, max_memory_size);

    println!("{}", result.summary);
    println!("  Strategy:            {}", result.strategy);
    println!("  Removed:             {}", result.removed_count);
    println!("  Preserved:           {}", result.preserved_count);
    println!(
        "  Size:                {} -> {} bytes (budget {})",
        result.original_size, result.compressed_size, result.max_memory_size
    );
    println!("  Reduction:           {:.2}%", result.reduction_percentage);

    let compacted = serde_json::to_string_pretty(&result.memory)?;
    match output {
        Some(path) => {
            std::fs::write(path, compacted)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Compacted memory written to {}", path.display());
        }
        None => {
            println!();
            println!("{compacted}");
        }
    }

    Ok(())
}
