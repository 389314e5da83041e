//! Bounded-memory compression: strategy-driven eviction down to a byte budget.

pub mod engine;
pub mod strategy;
pub mod types;

pub use engine::compress;
pub use strategy::CompressionStrategy;
pub use types::{CompressionResult, ItemSlot, MemoryItem, MemoryStructure};
