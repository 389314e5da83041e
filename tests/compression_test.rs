mod helpers;

use ganglion::compression::{compress, CompressionStrategy, ItemSlot};
use helpers::{item_field, memory};
use serde_json::json;

#[test]
fn within_budget_is_a_no_op() {
    let input = memory(json!({
        "history": [{"data": "a", "timestamp": 1}, {"data": "b", "timestamp": 2}],
        "traits": {"curiosity": 0.7}
    }));
    let budget = input.serialized_size();

    let result = compress(input.clone(), CompressionStrategy::Temporal, None, budget);

    assert_eq!(result.removed_count, 0);
    assert_eq!(result.preserved_count, 2);
    assert_eq!(result.memory, input);
    assert_eq!(result.reduction_percentage, 0.0);
    assert!(result.within_budget);
    assert!(result.removed.is_empty());
}

#[test]
fn temporal_removes_the_oldest_item() {
    let input = memory(json!({
        "history": [
            {"data": "oldest", "timestamp": 1000},
            {"data": "newest", "timestamp": 3000},
            {"data": "middle", "timestamp": 2000}
        ]
    }));
    let budget = memory(json!({
        "history": [
            {"data": "newest", "timestamp": 3000},
            {"data": "middle", "timestamp": 2000}
        ]
    }))
    .serialized_size();

    let result = compress(input, CompressionStrategy::Temporal, None, budget);

    assert_eq!(result.removed_count, 1);
    assert_eq!(result.preserved_count, 2);
    assert!(result.within_budget);
    assert_eq!(result.compressed_size, budget);
    let survivors = item_field(result.memory.items("history").unwrap(), "data");
    assert_eq!(survivors, vec!["newest", "middle"]);
}

#[test]
fn importance_removes_the_lowest_confidence_item() {
    // Identical source and timestamp: only the score tells these apart.
    let input = memory(json!({
        "knowledge_base": [
            {"content": "low", "source": "web", "confidence_score": 0.2, "created_at": "2025-01-01T00:00:00Z"},
            {"content": "high", "source": "web", "confidence_score": 0.9, "created_at": "2025-01-01T00:00:00Z"},
            {"content": "mid", "source": "web", "confidence_score": 0.6, "created_at": "2025-01-01T00:00:00Z"}
        ]
    }));
    let budget = input.serialized_size() - 1;

    let result = compress(input, CompressionStrategy::Importance, None, budget);

    assert_eq!(result.removed_count, 1);
    assert_eq!(
        result.removed,
        vec![ItemSlot {
            category: "knowledge_base".into(),
            index: 0
        }]
    );
    let survivors = item_field(result.memory.items("knowledge_base").unwrap(), "content");
    assert_eq!(survivors, vec!["high", "mid"]);
}

#[test]
fn identical_items_are_removed_by_position_not_value() {
    let twin = json!({"data": "same", "timestamp": 5});
    let input = memory(json!({
        "alpha": [twin.clone()],
        "beta": [twin.clone()]
    }));
    let budget = input.serialized_size() - 1;

    let result = compress(input, CompressionStrategy::Temporal, None, budget);

    assert_eq!(result.removed_count, 1);
    assert_eq!(result.memory.category_len("alpha"), 0);
    assert_eq!(result.memory.category_len("beta"), 1);
}

#[test]
fn eviction_order_spans_categories() {
    let input = memory(json!({
        "history": [{"event": "recent", "timestamp": 50}],
        "knowledge_base": [
            {"content": "ancient", "created_at": "2001-01-01T00:00:00Z"},
            {"content": "fresh", "created_at": "2030-01-01T00:00:00Z"}
        ]
    }));
    let budget = input.serialized_size() - 1;

    let result = compress(input, CompressionStrategy::Hybrid, None, budget);

    // 50ms after epoch is older than 2001.
    assert_eq!(result.memory.category_len("history"), 0);
    assert_eq!(result.memory.category_len("knowledge_base"), 2);
}

#[test]
fn items_without_signals_go_first() {
    let input = memory(json!({
        "notes": ["untimed", {"text": "timed", "timestamp": 10}]
    }));
    let budget = input.serialized_size() - 1;

    let result = compress(input, CompressionStrategy::Temporal, None, budget);

    assert_eq!(
        result.memory.items("notes").unwrap()[0].0,
        json!({"text": "timed", "timestamp": 10})
    );
}

#[test]
fn unreachable_budget_reports_partial_success() {
    let input = memory(json!({
        "history": [{"data": "a", "timestamp": 1}, {"data": "b", "timestamp": 2}],
        "profile": {"name": "organism-7", "generation": 4}
    }));

    let result = compress(input, CompressionStrategy::Temporal, None, 10);

    assert_eq!(result.removed_count, 2);
    assert_eq!(result.preserved_count, 0);
    assert!(!result.within_budget);
    assert!(result.summary.starts_with("Partial compression"));
    assert_eq!(
        result.memory.to_value(),
        json!({"history": [], "profile": {"name": "organism-7", "generation": 4}})
    );
    assert!(result.reduction_percentage > 0.0);
}

#[test]
fn retention_threshold_pins_important_items() {
    let input = memory(json!({
        "knowledge_base": [
            {"content": "weak", "confidence_score": 0.2},
            {"content": "core", "confidence_score": 0.95},
            {"content": "okay", "confidence_score": 0.5}
        ]
    }));

    let result = compress(input, CompressionStrategy::Importance, Some(0.9), 0);

    assert_eq!(result.removed_count, 2);
    assert_eq!(result.preserved_count, 1);
    assert!(!result.within_budget);
    let survivors = item_field(result.memory.items("knowledge_base").unwrap(), "content");
    assert_eq!(survivors, vec!["core"]);
}

#[test]
fn report_sizes_and_percentage_are_consistent() {
    let input = memory(json!({
        "history": (0..20)
            .map(|i| json!({"data": format!("event number {i}"), "timestamp": i}))
            .collect::<Vec<_>>()
    }));
    let original = input.serialized_size();

    let result = compress(input, CompressionStrategy::Temporal, None, original / 2);

    assert_eq!(result.original_size, original);
    assert_eq!(result.compressed_size, result.memory.serialized_size());
    assert!(result.compressed_size <= original / 2);
    let pct = (original - result.compressed_size) as f64 / original as f64 * 100.0;
    let expected = (pct * 100.0).round() / 100.0;
    assert_eq!(result.reduction_percentage, expected);

    // Oldest events were the ones dropped.
    let first_kept = &result.memory.items("history").unwrap()[0];
    assert_eq!(first_kept.0["timestamp"], json!(result.removed_count));
}
