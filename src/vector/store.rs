//! The vector store facade: string IDs in, ranked string IDs out.
//!
//! [`VectorStore`] pairs an [`HnswIndex`] with an [`IdMap`] behind one read-write lock.
//! Inserts, resizes and saves take the write lock; searches and stats share the read
//! lock. [`LazyStore`] and [`global`] provide exactly-once initialization.

use serde::Serialize;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::config::GanglionConfig;
use crate::error::{Result, VectorStoreError};
use crate::vector::hnsw::{HnswIndex, HnswParams};
use crate::vector::id_map::IdMap;
use crate::vector::persistence::{self, LoadOutcome, StorePaths};

/// Everything needed to open a store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub params: HnswParams,
    pub capacity: usize,
    pub paths: StorePaths,
}

impl StoreOptions {
    pub fn from_config(config: &GanglionConfig) -> Self {
        Self {
            params: config.index.hnsw_params(),
            capacity: config.index.capacity,
            paths: config.store_paths(),
        }
    }
}

/// Result of [`VectorStore::add_vector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddOutcome {
    Inserted { label: u64 },
    /// The ID was already indexed; nothing changed.
    Duplicate { label: u64 },
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub count: usize,
    pub capacity: usize,
    pub dimension: usize,
    pub next_label: u64,
}

struct StoreState {
    index: HnswIndex,
    ids: IdMap,
}

pub struct VectorStore {
    state: RwLock<StoreState>,
    paths: StorePaths,
}

impl VectorStore {
    /// Load persisted state, or start empty when it is missing or unusable.
    ///
    /// Load failures never propagate: a corrupt pair is logged and discarded.
    pub fn open(options: StoreOptions) -> Self {
        let StoreOptions {
            params,
            capacity,
            paths,
        } = options;

        let state = match persistence::load(&paths, params.dimension) {
            LoadOutcome::Loaded { index, ids } => {
                info!(
                    index = %paths.index.display(),
                    count = index.len(),
                    next_label = ids.next_label(),
                    "vector store loaded"
                );
                StoreState { index, ids }
            }
            LoadOutcome::Missing => {
                info!(index = %paths.index.display(), "no persisted vector store, starting empty");
                StoreState::fresh(params, capacity)
            }
            LoadOutcome::Corrupt(err) => {
                warn!(error = %err, "discarding persisted vector store, starting empty");
                StoreState::fresh(params, capacity)
            }
        };

        Self {
            state: RwLock::new(state),
            paths,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| VectorStoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| VectorStoreError::LockPoisoned)
    }

    /// Index `vector` under `id`.
    ///
    /// Re-adding a known ID is a logged no-op, never an overwrite. A label is only kept
    /// if the engine accepted the point.
    pub fn add_vector(&self, vector: &[f32], id: &str) -> Result<AddOutcome> {
        let mut state = self.write()?;
        let dimension = state.index.dimension();
        if vector.len() != dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let label = match state.ids.assign_label(id) {
            Ok(label) => label,
            Err(VectorStoreError::DuplicateId { label, .. }) => {
                info!(id = %id, label, "id already indexed, skipping");
                return Ok(AddOutcome::Duplicate { label });
            }
            Err(err) => return Err(err),
        };

        if let Err(err) = state.index.insert(vector, label) {
            state.ids.rollback(label);
            warn!(id = %id, label, error = %err, "insert rejected, label rolled back");
            return Err(err);
        }

        debug!(id = %id, label, "vector indexed");
        Ok(AddOutcome::Inserted { label })
    }

    /// Up to `k` nearest IDs by ascending distance. Labels without an ID are dropped.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let state = self.read()?;
        let hits = state.index.query(query, k)?;

        Ok(hits
            .into_iter()
            .filter_map(|(label, distance)| match state.ids.resolve(label) {
                Some(id) => Some(SearchHit {
                    id: id.to_string(),
                    distance,
                }),
                None => {
                    warn!(label, "search hit has no mapped id, dropping");
                    None
                }
            })
            .collect())
    }

    /// Persist the index and sidecar. Holds the write lock so the snapshot is consistent.
    pub fn save(&self) -> Result<()> {
        let state = self.write()?;
        match persistence::save(&state.index, &state.ids, &self.paths) {
            Ok(()) => {
                info!(
                    index = %self.paths.index.display(),
                    count = state.index.len(),
                    "vector store saved"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "vector store save failed");
                Err(err)
            }
        }
    }

    /// Grow the index capacity. Returns `false` if it was already large enough.
    pub fn resize(&self, capacity: usize) -> Result<bool> {
        let mut state = self.write()?;
        let grown = state.index.resize(capacity);
        if grown {
            info!(capacity, "vector index resized");
        }
        Ok(grown)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.read()?.ids.label_of(id).is_some())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let state = self.read()?;
        Ok(StoreStats {
            count: state.index.len(),
            capacity: state.index.capacity(),
            dimension: state.index.dimension(),
            next_label: state.ids.next_label(),
        })
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }
}

impl StoreState {
    fn fresh(params: HnswParams, capacity: usize) -> Self {
        Self {
            index: HnswIndex::new(params, capacity),
            ids: IdMap::new(),
        }
    }
}

/// A store that is opened on first access, exactly once, however many threads race
/// for it.
pub struct LazyStore {
    options: StoreOptions,
    cell: OnceLock<Arc<VectorStore>>,
}

impl LazyStore {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Arc<VectorStore> {
        self.cell
            .get_or_init(|| Arc::new(VectorStore::open(self.options.clone())))
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

static GLOBAL: OnceLock<LazyStore> = OnceLock::new();

/// The process-wide store. The first caller's config decides where it lives.
pub fn global(config: &GanglionConfig) -> Arc<VectorStore> {
    GLOBAL
        .get_or_init(|| LazyStore::new(StoreOptions::from_config(config)))
        .get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> StoreOptions {
        StoreOptions {
            params: HnswParams {
                dimension: 2,
                ..Default::default()
            },
            capacity: 8,
            paths: StorePaths::in_dir(dir.path()),
        }
    }

    #[test]
    fn orphaned_labels_are_dropped_from_results() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(options(&tmp));
        store.add_vector(&[1.0, 0.0], "kept").unwrap();

        // Skew the index ahead of the map.
        store.state.write().unwrap().index.insert(&[0.0, 0.0], 99).unwrap();

        let hits = store.search(&[0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "kept");
    }

    #[test]
    fn failed_insert_rolls_back_label() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(options(&tmp));
        store.add_vector(&[1.0, 0.0], "a").unwrap();

        // Occupy the next label in the engine so the facade's insert fails.
        store.state.write().unwrap().index.insert(&[5.0, 5.0], 1).unwrap();

        let err = store.add_vector(&[2.0, 0.0], "b").unwrap_err();
        assert!(matches!(err, VectorStoreError::LabelInUse(1)));
        assert!(!store.contains("b").unwrap());
        assert_eq!(store.stats().unwrap().next_label, 1);
    }
}
