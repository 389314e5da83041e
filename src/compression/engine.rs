//! Budgeted eviction over a [`MemoryStructure`].
//!
//! [`compress`] never fails. When every removable item is gone and the structure is
//! still over budget, the result says so (`within_budget == false`) instead of erroring.

use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use super::strategy::{CompressionStrategy, EvictionCandidate};
use super::types::{CompressionResult, MemoryStructure};

/// Shrink `memory` to at most `max_memory_size` bytes of compact JSON.
///
/// Items are removed one at a time in `strategy` order. Items whose importance is at or
/// above `retention_threshold` are never removed. Removal is by original
/// `(category, index)` slot, so items with identical content are told apart.
pub fn compress(
    mut memory: MemoryStructure,
    strategy: CompressionStrategy,
    retention_threshold: Option<f64>,
    max_memory_size: usize,
) -> CompressionResult {
    let original_size = memory.serialized_size();
    let total_items = memory.item_count();

    if original_size <= max_memory_size {
        return CompressionResult {
            memory,
            strategy,
            removed_count: 0,
            preserved_count: total_items,
            reduction_percentage: 0.0,
            original_size,
            compressed_size: original_size,
            max_memory_size,
            within_budget: true,
            removed: Vec::new(),
            summary: format!(
                "Memory is {original_size} bytes, within the {max_memory_size} byte budget; nothing removed"
            ),
        };
    }

    let mut pinned = 0usize;
    let mut candidates: Vec<EvictionCandidate> = memory
        .iter_items()
        .filter_map(|(slot, item)| {
            let importance = item.importance();
            if retention_threshold.is_some_and(|t| importance >= t) {
                pinned += 1;
                return None;
            }
            Some(EvictionCandidate {
                slot,
                timestamp: item.timestamp_millis(),
                importance,
                size: item.serialized_size(),
            })
        })
        .collect();
    strategy.sort(&mut candidates);

    let mut remaining: BTreeMap<String, usize> = BTreeMap::new();
    let mut size = original_size;
    let mut removed = Vec::new();
    for candidate in candidates {
        if size <= max_memory_size {
            break;
        }
        let left = remaining
            .entry(candidate.slot.category.clone())
            .or_insert_with(|| memory.category_len(&candidate.slot.category));
        // Compact JSON arrays: dropping one of n >= 2 elements also drops one comma.
        size = size.saturating_sub(candidate.size + usize::from(*left > 1));
        *left -= 1;
        removed.push(candidate.slot);
    }

    let mut by_category: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for slot in &removed {
        by_category
            .entry(slot.category.clone())
            .or_default()
            .insert(slot.index);
    }
    memory.remove_slots(&by_category);

    let compressed_size = memory.serialized_size();
    debug_assert_eq!(compressed_size, size, "incremental size accounting drifted");

    let removed_count = removed.len();
    let preserved_count = total_items - removed_count;
    let within_budget = compressed_size <= max_memory_size;
    let reduction_percentage = reduction_percentage(original_size, compressed_size);

    let summary = if within_budget {
        format!(
            "Removed {removed_count} of {total_items} items using {strategy} eviction; \
             {original_size} -> {compressed_size} bytes ({reduction_percentage}% reduction)"
        )
    } else {
        format!(
            "Partial compression: removed {removed_count} of {total_items} items using {strategy} \
             eviction, but {compressed_size} bytes still exceeds the {max_memory_size} byte budget \
             ({pinned} items retained by threshold)"
        )
    };

    info!(
        strategy = %strategy,
        removed_count,
        preserved_count,
        original_size,
        compressed_size,
        within_budget,
        "memory compressed"
    );

    CompressionResult {
        memory,
        strategy,
        removed_count,
        preserved_count,
        reduction_percentage,
        original_size,
        compressed_size,
        max_memory_size,
        within_budget,
        removed,
        summary,
    }
}

fn reduction_percentage(before: usize, after: usize) -> f64 {
    if before == 0 {
        return 0.0;
    }
    let pct = (before.saturating_sub(after)) as f64 / before as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
