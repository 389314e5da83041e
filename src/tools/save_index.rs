use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SaveIndexParams {
    #[schemars(description = "Optionally grow the index capacity before saving")]
    pub resize_to: Option<usize>,
}
