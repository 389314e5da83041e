//! MCP `add_vector` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `add_vector` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddVectorParams {
    /// Opaque caller-side identifier (e.g. a knowledge record ID).
    #[schemars(description = "Opaque identifier for the vector. Re-adding a known ID is a no-op.")]
    pub id: String,

    /// Embedding with exactly the configured number of dimensions.
    #[schemars(description = "Embedding vector; length must equal the index dimension")]
    pub vector: Vec<f32>,
}
