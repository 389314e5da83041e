//! MCP `compress_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `compress_memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CompressMemoryParams {
    /// Memory object: category name to list of items (or any other JSON value).
    #[schemars(
        description = "Memory object mapping category names to item arrays. Non-array values are kept as-is."
    )]
    pub memory: serde_json::Value,

    /// `"temporal"`, `"importance"` or `"hybrid"`. Defaults to the configured strategy.
    #[schemars(
        description = "Eviction order: 'temporal' (oldest first), 'importance' (lowest confidence first), 'hybrid' (default)"
    )]
    pub strategy: Option<String>,

    /// Byte budget for the serialized memory. Defaults to `compression.max_memory_size`.
    #[schemars(description = "Maximum serialized size in bytes")]
    pub max_memory_size: Option<usize>,

    /// Items scoring at or above this are never evicted.
    #[schemars(
        description = "Optional confidence/importance score at or above which items are never removed"
    )]
    pub retention_threshold: Option<f64>,
}
