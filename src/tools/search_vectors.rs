//! MCP `search_vectors` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `search_vectors` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchVectorsParams {
    /// Query embedding.
    #[schemars(description = "Query vector; length must equal the index dimension")]
    pub vector: Vec<f32>,

    /// Number of neighbors to return. Defaults to `index.default_k`.
    #[schemars(description = "Maximum number of nearest neighbors to return. Defaults to 5.")]
    pub k: Option<usize>,
}
