//! Memory structure and compression report types.
//!
//! A [`MemoryStructure`] maps category names to either a list of items (evictable) or
//! any other JSON value (kept verbatim). Size is the byte length of its compact JSON
//! serialization.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io;

use super::strategy::CompressionStrategy;

const TIMESTAMP_FIELDS: [&str; 3] = ["timestamp", "created_at", "createdAt"];
const IMPORTANCE_FIELDS: [&str; 3] = ["confidence_score", "confidence", "importance"];

/// One entry in an item category, e.g. a knowledge-base record
/// `{content, source, confidence_score, created_at}` or a history event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryItem(pub serde_json::Value);

impl MemoryItem {
    /// Epoch milliseconds from the first timestamp-like field. Numbers are taken as
    /// milliseconds, strings are parsed as RFC 3339. Missing or unparseable is 0.
    pub fn timestamp_millis(&self) -> i64 {
        TIMESTAMP_FIELDS
            .iter()
            .find_map(|field| self.0.get(field))
            .and_then(|value| match value {
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f as i64)),
                serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.timestamp_millis()),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Confidence/importance score. Missing or non-numeric is 0.
    pub fn importance(&self) -> f64 {
        IMPORTANCE_FIELDS
            .iter()
            .find_map(|field| self.0.get(field).and_then(serde_json::Value::as_f64))
            .unwrap_or(0.0)
    }

    pub fn serialized_size(&self) -> usize {
        serialized_size(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Items(Vec<MemoryItem>),
    Value(serde_json::Value),
}

/// Position of an item before any removal: category name plus index within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ItemSlot {
    pub category: String,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStructure {
    categories: BTreeMap<String, Category>,
}

impl MemoryStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON. Anything other than an object is rejected.
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.categories
                .iter()
                .map(|(name, category)| {
                    let value = match category {
                        Category::Items(items) => serde_json::Value::Array(
                            items.iter().map(|item| item.0.clone()).collect(),
                        ),
                        Category::Value(value) => value.clone(),
                    };
                    (name.clone(), value)
                })
                .collect(),
        )
    }

    pub fn insert_items(&mut self, name: impl Into<String>, items: Vec<MemoryItem>) {
        self.categories.insert(name.into(), Category::Items(items));
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.categories.insert(name.into(), Category::Value(value));
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn items(&self, name: &str) -> Option<&[MemoryItem]> {
        match self.categories.get(name)? {
            Category::Items(items) => Some(items),
            Category::Value(_) => None,
        }
    }

    /// Every item of every list category, with its slot, in category-then-index order.
    pub fn iter_items(&self) -> impl Iterator<Item = (ItemSlot, &MemoryItem)> {
        self.categories
            .iter()
            .filter_map(|(name, category)| match category {
                Category::Items(items) => Some((name, items)),
                Category::Value(_) => None,
            })
            .flat_map(|(name, items)| {
                items.iter().enumerate().map(move |(index, item)| {
                    (
                        ItemSlot {
                            category: name.clone(),
                            index,
                        },
                        item,
                    )
                })
            })
    }

    pub fn item_count(&self) -> usize {
        self.categories
            .values()
            .map(|c| match c {
                Category::Items(items) => items.len(),
                Category::Value(_) => 0,
            })
            .sum()
    }

    pub fn category_len(&self, name: &str) -> usize {
        self.items(name).map_or(0, <[MemoryItem]>::len)
    }

    /// Remove exactly the items at `slots`, where indices refer to positions before
    /// this call. Unknown slots are ignored.
    pub fn remove_slots(&mut self, slots: &BTreeMap<String, BTreeSet<usize>>) {
        for (name, indices) in slots {
            if let Some(Category::Items(items)) = self.categories.get_mut(name) {
                let mut index = 0;
                items.retain(|_| {
                    let keep = !indices.contains(&index);
                    index += 1;
                    keep
                });
            }
        }
    }

    /// Byte length of the compact JSON serialization.
    pub fn serialized_size(&self) -> usize {
        serialized_size(self)
    }
}

/// Outcome of one compression run.
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    pub memory: MemoryStructure,
    pub strategy: CompressionStrategy,
    pub removed_count: usize,
    pub preserved_count: usize,
    /// Byte reduction relative to the original size, rounded to 2 decimals.
    pub reduction_percentage: f64,
    pub original_size: usize,
    pub compressed_size: usize,
    pub max_memory_size: usize,
    pub within_budget: bool,
    /// Slots removed, in removal order, as positions in the input structure.
    pub removed: Vec<ItemSlot>,
    pub summary: String,
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn serialized_size<T: Serialize + ?Sized>(value: &T) -> usize {
    let mut counter = ByteCounter(0);
    // JSON values with string keys always serialize.
    if let Err(err) = serde_json::to_writer(&mut counter, value) {
        tracing::error!(error = %err, "size measurement failed");
    }
    counter.0
}
