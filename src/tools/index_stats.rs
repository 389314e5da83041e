use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IndexStatsParams {
    #[schemars(description = "If true, also report the on-disk artifact paths")]
    pub include_paths: Option<bool>,
}
