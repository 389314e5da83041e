//! Knowledge persistence core for long-lived agents ("organisms").
//!
//! Ganglion keeps two things within bounds across process restarts:
//!
//! | Subsystem | Input | Output |
//! |-----------|-------|--------|
//! | **Vector store** | embedding + opaque string ID | ranked `(id, distance)` pairs |
//! | **Memory compression** | memory object + byte budget | compacted object + report |
//!
//! # Architecture
//!
//! - **Index**: in-process HNSW graph, squared-L2 distance, fixed dimension and capacity
//! - **Identity**: dense integer labels behind a bidirectional map, never reused
//! - **Persistence**: index binary + JSON sidecar, staged and renamed as a pair
//! - **Eviction**: temporal, importance, or hybrid ordering over every list category
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`error`] — Vector store error taxonomy
//! - [`vector`] — Identifier map, HNSW engine, persistence, and the store facade
//! - [`compression`] — Eviction strategies and the budgeted compression engine

pub mod compression;
pub mod config;
pub mod error;
pub mod vector;
