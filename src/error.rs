//! Error taxonomy for the vector store.
//!
//! Compression has no error type: it always returns a result, reporting partial
//! success when the byte budget cannot be met.

use std::path::PathBuf;

/// Errors raised by the identifier map, the HNSW engine, persistence, and the facade.
#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    /// The ID is already mapped to a label. Callers treat this as a skip.
    #[error("id {id:?} is already mapped to label {label}")]
    DuplicateId { id: String, label: u64 },

    /// The engine already holds a point for this label.
    #[error("label {0} is already present in the index")]
    LabelInUse(u64),

    /// Vector length does not match the store-wide dimension.
    #[error("vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The index is full. Resize explicitly or reject the insert.
    #[error("index is at capacity ({capacity} elements)")]
    CapacityExceeded { capacity: usize },

    /// A persisted artifact could not be read or failed validation.
    #[error("persisted state at {path} is unusable: {reason}")]
    PersistenceCorrupt { path: PathBuf, reason: String },

    /// Writing a persisted artifact failed. Previous files are left in place.
    #[error("failed to write {path}: {source}")]
    PersistenceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl VectorStoreError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::PersistenceCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceWrite {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = VectorStoreError> = std::result::Result<T, E>;
