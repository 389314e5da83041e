//! HNSW (Hierarchical Navigable Small World) approximate nearest-neighbor engine.
//!
//! The engine stores vectors under caller-assigned labels; it never invents labels
//! itself. Distance is squared Euclidean (L2²). Capacity is fixed at construction and
//! can only grow through [`HnswIndex::resize`].
//!
//! # Binary format
//!
//! ```text
//! b"GNGLHNSW" | u32 LE format version | bincode(snapshot)
//! ```
//!
//! The snapshot holds parameters, capacity, nodes (label, vector, per-layer adjacency),
//! entry point and top layer. Anything with another magic or version is rejected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::io::{self, Read, Write};

use crate::error::{Result, VectorStoreError};

pub const FORMAT_MAGIC: &[u8; 8] = b"GNGLHNSW";
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on node layers. With m >= 2 the chance of reaching it is negligible.
const MAX_LAYER: usize = 16;

/// Beam width for the descent through the upper layers.
const DESCENT_EF: usize = 8;

/// Graph construction and search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Vector dimension, fixed for the lifetime of the index.
    pub dimension: usize,
    /// Links per node on upper layers; layer 0 allows `2 * m`.
    pub m: usize,
    /// Beam width while inserting.
    pub ef_construction: usize,
    /// Beam width while querying (raised to `k` when `k` is larger).
    pub ef_search: usize,
    /// Seed for layer assignment.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            dimension: 384,
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            seed: 0x6e67_6c69_6f6e,
        }
    }
}

impl HnswParams {
    fn max_links(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * 2
        } else {
            self.m
        }
    }

    fn level_multiplier(&self) -> f64 {
        1.0 / (self.m.max(2) as f64).ln()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    label: u64,
    vector: Vec<f32>,
    /// Neighbor slots, one list per layer this node lives on.
    layers: Vec<Vec<u32>>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    params: &'a HnswParams,
    capacity: usize,
    nodes: &'a [Node],
    entry_point: Option<u32>,
    top_layer: usize,
}

#[derive(Deserialize)]
struct Snapshot {
    params: HnswParams,
    capacity: usize,
    nodes: Vec<Node>,
    entry_point: Option<u32>,
    top_layer: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    slot: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[derive(Debug, Clone)]
pub struct HnswIndex {
    params: HnswParams,
    capacity: usize,
    nodes: Vec<Node>,
    entry_point: Option<u32>,
    top_layer: usize,
    /// label -> slot in `nodes`; rebuilt on load.
    slots: HashMap<u64, u32>,
}

impl HnswIndex {
    /// Allocate an empty index holding at most `capacity` points.
    pub fn new(params: HnswParams, capacity: usize) -> Self {
        Self {
            params,
            capacity,
            nodes: Vec::new(),
            entry_point: None,
            top_layer: 0,
            slots: HashMap::new(),
        }
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn dimension(&self) -> usize {
        self.params.dimension
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, label: u64) -> bool {
        self.slots.contains_key(&label)
    }

    pub fn labels(&self) -> impl Iterator<Item = u64> + '_ {
        self.nodes.iter().map(|n| n.label)
    }

    /// Grow capacity to `new_capacity`. Returns `false` (and changes nothing) when the
    /// index is already at least that large.
    pub fn resize(&mut self, new_capacity: usize) -> bool {
        if new_capacity <= self.capacity {
            return false;
        }
        self.capacity = new_capacity;
        true
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.params.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.params.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Insert `vector` under `label`. The label must not already be present.
    pub fn insert(&mut self, vector: &[f32], label: u64) -> Result<()> {
        self.check_dimension(vector)?;
        if self.slots.contains_key(&label) {
            return Err(VectorStoreError::LabelInUse(label));
        }
        if self.nodes.len() >= self.capacity {
            return Err(VectorStoreError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let slot = self.nodes.len() as u32;
        let level = self.level_for(label);
        self.nodes.push(Node {
            label,
            vector: vector.to_vec(),
            layers: vec![Vec::new(); level + 1],
        });
        self.slots.insert(label, slot);

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(slot);
            self.top_layer = level;
            return Ok(());
        };

        let mut nearest = vec![self.candidate(vector, entry)];
        for layer in (level + 1..=self.top_layer).rev() {
            nearest = self.descend(vector, &nearest, layer);
        }

        for layer in (0..=level.min(self.top_layer)).rev() {
            let found = self.search_layer(vector, &nearest, self.params.ef_construction, layer);
            let pool: Vec<Candidate> = found.iter().copied().filter(|c| c.slot != slot).collect();
            let neighbors = self.select_neighbors(pool, self.params.max_links(layer), false);

            for &neighbor in &neighbors {
                self.link(neighbor, slot, layer);
            }
            self.nodes[slot as usize].layers[layer] = neighbors;
            nearest = found;
        }

        if level > self.top_layer {
            self.top_layer = level;
            self.entry_point = Some(slot);
        }
        Ok(())
    }

    /// Up to `k` nearest labels by ascending distance; ties go to the lower label.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        self.check_dimension(vector)?;
        let Some(entry) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut nearest = vec![self.candidate(vector, entry)];
        for layer in (1..=self.top_layer).rev() {
            nearest = self.descend(vector, &nearest, layer);
        }
        let ef = self.params.ef_search.max(k);
        let found = self.search_layer(vector, &nearest, ef, 0);

        let mut hits: Vec<(u64, f32)> = found
            .into_iter()
            .map(|c| (self.nodes[c.slot as usize].label, c.distance))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
    }

    fn candidate(&self, query: &[f32], slot: u32) -> Candidate {
        Candidate {
            distance: l2_squared(query, &self.nodes[slot as usize].vector),
            slot,
        }
    }

    /// Narrow beam on an upper layer; only the closest hit seeds the next layer down.
    fn descend(&self, query: &[f32], entry_points: &[Candidate], layer: usize) -> Vec<Candidate> {
        let mut found = self.search_layer(query, entry_points, DESCENT_EF, layer);
        found.truncate(1);
        found
    }

    fn links(&self, slot: u32, layer: usize) -> &[u32] {
        self.nodes[slot as usize]
            .layers
            .get(layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Beam search on one layer. Returns at most `ef` candidates, closest first.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[Candidate],
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let ef = ef.max(1);
        let mut visited: HashSet<u32> = entry_points.iter().map(|c| c.slot).collect();
        let mut frontier: BinaryHeap<Reverse<Candidate>> =
            entry_points.iter().copied().map(Reverse).collect();
        let mut results: BinaryHeap<Candidate> = entry_points.iter().copied().collect();
        while results.len() > ef {
            results.pop();
        }

        while let Some(Reverse(current)) = frontier.pop() {
            if let Some(farthest) = results.peek() {
                if results.len() >= ef && current.distance > farthest.distance {
                    break;
                }
            }

            for &neighbor in self.links(current.slot, layer) {
                if !visited.insert(neighbor) {
                    continue;
                }
                let candidate = self.candidate(query, neighbor);
                let admit = results.len() < ef || results.peek().is_some_and(|f| candidate < *f);
                if admit {
                    frontier.push(Reverse(candidate));
                    results.push(candidate);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results.into_sorted_vec()
    }

    /// Pick up to `max` links from `candidates` (distances measured from the node being
    /// linked). A candidate is taken only if it is closer to the node than to every link
    /// already taken. With `keep_pruned`, leftover room goes to the closest skipped
    /// candidates.
    fn select_neighbors(
        &self,
        mut candidates: Vec<Candidate>,
        max: usize,
        keep_pruned: bool,
    ) -> Vec<u32> {
        candidates.sort();
        candidates.dedup_by_key(|c| c.slot);

        let mut selected: Vec<Candidate> = Vec::with_capacity(max);
        let mut skipped: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if selected.len() >= max {
                break;
            }
            let vector = &self.nodes[candidate.slot as usize].vector;
            let diverse = selected.iter().all(|chosen| {
                candidate.distance < l2_squared(vector, &self.nodes[chosen.slot as usize].vector)
            });
            if diverse {
                selected.push(candidate);
            } else {
                skipped.push(candidate);
            }
        }

        if keep_pruned {
            let room = max.saturating_sub(selected.len());
            selected.extend(skipped.into_iter().take(room));
        }
        selected.into_iter().map(|c| c.slot).collect()
    }

    /// Add a back-link `from -> to`, re-selecting the link set when over budget.
    fn link(&mut self, from: u32, to: u32, layer: usize) {
        let max = self.params.max_links(layer);
        let node = &self.nodes[from as usize];
        let Some(existing) = node.layers.get(layer) else {
            return;
        };
        if existing.contains(&to) {
            return;
        }

        let links = if existing.len() < max {
            let mut links = existing.clone();
            links.push(to);
            links
        } else {
            let scored: Vec<Candidate> = existing
                .iter()
                .chain(std::iter::once(&to))
                .map(|&s| Candidate {
                    distance: l2_squared(&node.vector, &self.nodes[s as usize].vector),
                    slot: s,
                })
                .collect();
            self.select_neighbors(scored, max, true)
        };
        self.nodes[from as usize].layers[layer] = links;
    }

    /// Layer for a label, derived from `(seed, label)` so rebuilds are reproducible.
    fn level_for(&self, label: u64) -> usize {
        let mut rng =
            StdRng::seed_from_u64(self.params.seed ^ label.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let uniform: f64 = rng.gen_range(f64::EPSILON..1.0);
        let level = (-uniform.ln() * self.params.level_multiplier()).floor() as usize;
        level.min(MAX_LAYER)
    }

    /// Write the engine-native binary form.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(FORMAT_MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        let snapshot = SnapshotRef {
            params: &self.params,
            capacity: self.capacity,
            nodes: &self.nodes,
            entry_point: self.entry_point,
            top_layer: self.top_layer,
        };
        bincode::serialize_into(&mut writer, &snapshot).map_err(io::Error::other)?;
        writer.flush()
    }

    /// Read and validate the binary form. The error is a human-readable reason.
    pub fn read_from<R: Read>(mut reader: R) -> std::result::Result<Self, String> {
        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|e| format!("reading header: {e}"))?;
        if &magic != FORMAT_MAGIC {
            return Err("not an index file (bad magic)".into());
        }
        let mut version = [0u8; 4];
        reader
            .read_exact(&mut version)
            .map_err(|e| format!("reading version: {e}"))?;
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            ));
        }

        let snapshot: Snapshot =
            bincode::deserialize_from(reader).map_err(|e| format!("decoding body: {e}"))?;
        Self::from_snapshot(snapshot)
    }

    fn from_snapshot(snapshot: Snapshot) -> std::result::Result<Self, String> {
        let Snapshot {
            params,
            capacity,
            nodes,
            entry_point,
            top_layer,
        } = snapshot;

        if nodes.len() > capacity {
            return Err(format!(
                "{} nodes exceed capacity {capacity}",
                nodes.len()
            ));
        }

        let mut slots = HashMap::with_capacity(nodes.len());
        for (slot, node) in nodes.iter().enumerate() {
            if node.vector.len() != params.dimension {
                return Err(format!(
                    "label {} has {} dimensions, expected {}",
                    node.label,
                    node.vector.len(),
                    params.dimension
                ));
            }
            if node.layers.is_empty() {
                return Err(format!("label {} has no layers", node.label));
            }
            let dangling = node
                .layers
                .iter()
                .flatten()
                .any(|&n| n as usize >= nodes.len());
            if dangling {
                return Err(format!("label {} links to a missing node", node.label));
            }
            if slots.insert(node.label, slot as u32).is_some() {
                return Err(format!("label {} appears twice", node.label));
            }
        }

        match entry_point {
            None if !nodes.is_empty() => return Err("missing entry point".into()),
            Some(ep) if ep as usize >= nodes.len() => return Err("entry point out of range".into()),
            Some(ep) if nodes[ep as usize].layers.len() != top_layer + 1 => {
                return Err("entry point does not span the top layer".into())
            }
            _ => {}
        }

        Ok(Self {
            params,
            capacity,
            nodes,
            entry_point,
            top_layer,
            slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(dimension: usize) -> HnswParams {
        HnswParams {
            dimension,
            m: 4,
            ef_construction: 32,
            ef_search: 16,
            ..Default::default()
        }
    }

    fn default_params(dimension: usize) -> HnswParams {
        HnswParams {
            dimension,
            ..Default::default()
        }
    }

    fn brute_force(points: &[Vec<f32>], query: &[f32], k: usize) -> Vec<u64> {
        let mut scored: Vec<(u64, f32)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as u64, l2_squared(p, query)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.into_iter().take(k).map(|(l, _)| l).collect()
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = HnswIndex::new(params(3), 10);
        assert!(index.query(&[0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn query_orders_by_distance() {
        let mut index = HnswIndex::new(params(2), 10);
        index.insert(&[3.0, 0.0], 0).unwrap();
        index.insert(&[1.0, 0.0], 1).unwrap();
        index.insert(&[2.0, 0.0], 2).unwrap();

        let hits = index.query(&[0.0, 0.0], 3).unwrap();
        assert_eq!(hits, vec![(1, 1.0), (2, 4.0), (0, 9.0)]);
    }

    #[test]
    fn equal_distances_break_ties_by_label() {
        let mut index = HnswIndex::new(params(2), 10);
        index.insert(&[0.0, 1.0], 7).unwrap();
        index.insert(&[1.0, 0.0], 3).unwrap();
        index.insert(&[0.0, -1.0], 5).unwrap();

        let labels: Vec<u64> = index
            .query(&[0.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|(l, _)| l)
            .collect();
        assert_eq!(labels, vec![3, 5, 7]);
    }

    #[test]
    fn small_index_matches_brute_force() {
        // n <= 2m keeps every back-link, so layer 0 is connected and ef >= n visits it all
        let mut index = HnswIndex::new(
            HnswParams {
                m: 8,
                ef_search: 32,
                ..params(4)
            },
            100,
        );
        let mut rng = StdRng::seed_from_u64(42);
        let points: Vec<Vec<f32>> = (0..16)
            .map(|_| (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();
        for (label, p) in points.iter().enumerate() {
            index.insert(p, label as u64).unwrap();
        }

        let query = [0.1, -0.2, 0.3, 0.0];
        let got: Vec<u64> = index
            .query(&query, 5)
            .unwrap()
            .into_iter()
            .map(|(l, _)| l)
            .collect();
        assert_eq!(got, brute_force(&points, &query, 5));
    }

    fn clustered_points(clusters: usize, per_cluster: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..clusters)
            .flat_map(|c| {
                let center = [
                    (c % 4) as f32 * 100.0,
                    (c / 4) as f32 * 100.0,
                    ((c * 7) % 3) as f32 * 100.0,
                    0.0,
                ];
                (0..per_cluster)
                    .map(|_| center.iter().map(|x| *x + rng.gen_range(-0.01f32..0.01)).collect())
                    .collect::<Vec<Vec<f32>>>()
            })
            .collect()
    }

    #[test]
    fn clustered_points_stay_reachable() {
        let points = clustered_points(20, 100, 7);
        let mut index = HnswIndex::new(default_params(4), points.len());
        for (label, p) in points.iter().enumerate() {
            index.insert(p, label as u64).unwrap();
        }

        let misses: Vec<u64> = points
            .iter()
            .enumerate()
            .filter(|(label, p)| index.query(p, 1).unwrap() != vec![(*label as u64, 0.0)])
            .map(|(label, _)| label as u64)
            .collect();
        assert!(misses.is_empty(), "labels not found by their own vector: {misses:?}");
    }

    #[test]
    fn clustered_recall_tracks_brute_force() {
        let points = clustered_points(10, 60, 11);
        let mut index = HnswIndex::new(default_params(4), points.len());
        for (label, p) in points.iter().enumerate() {
            index.insert(p, label as u64).unwrap();
        }

        let queries = clustered_points(10, 3, 99);
        let mut found = 0;
        for query in &queries {
            let got: HashSet<u64> = index
                .query(query, 10)
                .unwrap()
                .into_iter()
                .map(|(l, _)| l)
                .collect();
            found += brute_force(&points, query, 10)
                .iter()
                .filter(|l| got.contains(*l))
                .count();
        }
        let recall = found as f64 / (queries.len() * 10) as f64;
        assert!(recall >= 0.95, "recall@10 was {recall}");
    }

    #[test]
    fn rejects_wrong_dimension_and_reused_label() {
        let mut index = HnswIndex::new(params(2), 10);
        index.insert(&[0.0, 0.0], 0).unwrap();

        assert!(matches!(
            index.insert(&[0.0], 1),
            Err(VectorStoreError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            index.insert(&[1.0, 1.0], 0),
            Err(VectorStoreError::LabelInUse(0))
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn capacity_is_enforced_until_resized() {
        let mut index = HnswIndex::new(params(1), 2);
        index.insert(&[0.0], 0).unwrap();
        index.insert(&[1.0], 1).unwrap();
        assert!(matches!(
            index.insert(&[2.0], 2),
            Err(VectorStoreError::CapacityExceeded { capacity: 2 })
        ));

        assert!(index.resize(3));
        assert!(!index.resize(3));
        assert!(!index.resize(1));
        assert_eq!(index.capacity(), 3);
        index.insert(&[2.0], 2).unwrap();
    }

    #[test]
    fn binary_form_restores_identical_results() {
        let mut index = HnswIndex::new(params(3), 50);
        for i in 0..20u64 {
            let x = i as f32;
            index.insert(&[x, x * 0.5, -x], i).unwrap();
        }

        let mut bytes = Vec::new();
        index.write_to(&mut bytes).unwrap();
        assert_eq!(&bytes[..8], FORMAT_MAGIC);

        let restored = HnswIndex::read_from(bytes.as_slice()).unwrap();
        let q = [4.2, 2.0, -4.0];
        assert_eq!(restored.query(&q, 6).unwrap(), index.query(&q, 6).unwrap());
        assert_eq!(restored.capacity(), 50);
        assert_eq!(restored.len(), 20);
    }

    #[test]
    fn read_rejects_bad_magic_and_truncation() {
        assert!(HnswIndex::read_from(&b"NOTANIDX\x01\0\0\0"[..]).is_err());

        let mut index = HnswIndex::new(params(2), 5);
        index.insert(&[1.0, 2.0], 0).unwrap();
        let mut bytes = Vec::new();
        index.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(HnswIndex::read_from(bytes.as_slice()).is_err());
    }
}
