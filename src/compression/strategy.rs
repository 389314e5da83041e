//! Eviction ordering: which memory items go first when over budget.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::types::ItemSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStrategy {
    /// Oldest first. Items without a timestamp count as epoch 0.
    Temporal,
    /// Lowest confidence/importance first. Items without a score count as 0.
    Importance,
    /// Oldest first, lowest importance breaking timestamp ties.
    #[default]
    Hybrid,
}

impl CompressionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Importance => "importance",
            Self::Hybrid => "hybrid",
        }
    }

    /// Total "remove-first" order. Equal signals fall back to original position.
    pub fn compare(&self, a: &EvictionCandidate, b: &EvictionCandidate) -> Ordering {
        let primary = match self {
            Self::Temporal => a.timestamp.cmp(&b.timestamp),
            Self::Importance => a.importance.total_cmp(&b.importance),
            Self::Hybrid => a
                .timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.importance.total_cmp(&b.importance)),
        };
        primary.then_with(|| a.slot.cmp(&b.slot))
    }

    pub fn sort(&self, candidates: &mut [EvictionCandidate]) {
        candidates.sort_by(|a, b| self.compare(a, b));
    }
}

impl std::fmt::Display for CompressionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompressionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temporal" => Ok(Self::Temporal),
            "importance" => Ok(Self::Importance),
            "hybrid" | "default" => Ok(Self::Hybrid),
            _ => Err(format!(
                "unknown compression strategy: {s} (expected temporal, importance or hybrid)"
            )),
        }
    }
}

/// An item under consideration for removal, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionCandidate {
    pub slot: ItemSlot,
    pub timestamp: i64,
    pub importance: f64,
    /// Compact JSON size of the item alone.
    pub size: usize,
}
