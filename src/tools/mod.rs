pub mod add_vector;
pub mod compress_memory;
pub mod index_stats;
pub mod save_index;
pub mod search_vectors;

use add_vector::AddVectorParams;
use compress_memory::CompressMemoryParams;
use index_stats::IndexStatsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use save_index::SaveIndexParams;
use search_vectors::SearchVectorsParams;
use std::sync::Arc;

use ganglion::compression::{self, CompressionStrategy, MemoryStructure};
use ganglion::config::GanglionConfig;
use ganglion::vector::VectorStore;

/// The Ganglion MCP tool handler. Holds the shared vector store and config and exposes
/// all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct GanglionTools {
    tool_router: ToolRouter<Self>,
    store: Arc<VectorStore>,
    config: Arc<GanglionConfig>,
}

#[tool_router]
impl GanglionTools {
    pub fn new(store: Arc<VectorStore>, config: Arc<GanglionConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
            config,
        }
    }

    /// Index an embedding under an opaque ID.
    #[tool(description = "Add an embedding to the vector index under an opaque ID. Re-adding an existing ID changes nothing.")]
    async fn add_vector(
        &self,
        Parameters(params): Parameters<AddVectorParams>,
    ) -> Result<String, String> {
        if params.id.is_empty() {
            return Err("id must not be empty".into());
        }

        tracing::info!(id = %params.id, dims = params.vector.len(), "add_vector called");

        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || store.add_vector(&params.vector, &params.id))
            .await
            .map_err(|e| format!("index task failed: {e}"))?
            .map_err(|e| format!("add failed: {e}"))?;

        serde_json::to_string(&outcome).map_err(|e| format!("serialization failed: {e}"))
    }

    /// k-nearest-neighbor search.
    #[tool(description = "Find the k nearest indexed IDs to a query vector, closest first.")]
    async fn search_vectors(
        &self,
        Parameters(params): Parameters<SearchVectorsParams>,
    ) -> Result<String, String> {
        let k = params.k.unwrap_or(self.config.index.default_k);
        tracing::info!(k, "search_vectors called");

        let store = Arc::clone(&self.store);
        let hits = tokio::task::spawn_blocking(move || store.search(&params.vector, k))
            .await
            .map_err(|e| format!("search task failed: {e}"))?
            .map_err(|e| format!("search failed: {e}"))?;

        Ok(serde_json::json!({
            "results": hits,
            "total": hits.len(),
        })
        .to_string())
    }

    /// Persist the index and its ID map.
    #[tool(description = "Save the vector index and its ID map to disk. Optionally grow capacity first.")]
    async fn save_index(
        &self,
        Parameters(params): Parameters<SaveIndexParams>,
    ) -> Result<String, String> {
        tracing::info!(resize_to = ?params.resize_to, "save_index called");

        let store = Arc::clone(&self.store);
        let (resized, stats) = tokio::task::spawn_blocking(move || {
            let resized = match params.resize_to {
                Some(capacity) => store.resize(capacity)?,
                None => false,
            };
            store.save()?;
            Ok::<_, ganglion::error::VectorStoreError>((resized, store.stats()?))
        })
        .await
        .map_err(|e| format!("save task failed: {e}"))?
        .map_err(|e| format!("save failed: {e}"))?;

        Ok(serde_json::json!({
            "saved": true,
            "resized": resized,
            "count": stats.count,
            "capacity": stats.capacity,
        })
        .to_string())
    }

    /// Report index size and configuration.
    #[tool(description = "Get vector index statistics: element count, capacity, dimension, next label.")]
    async fn index_stats(
        &self,
        Parameters(params): Parameters<IndexStatsParams>,
    ) -> Result<String, String> {
        tracing::info!("index_stats called");

        let stats = self.store.stats().map_err(|e| format!("stats failed: {e}"))?;
        let mut response =
            serde_json::to_value(&stats).map_err(|e| format!("serialization failed: {e}"))?;
        if params.include_paths.unwrap_or(false) {
            let paths = self.store.paths();
            response["index_path"] = paths.index.display().to_string().into();
            response["map_path"] = paths.map.display().to_string().into();
        }
        Ok(response.to_string())
    }

    /// Evict memory items until the structure fits a byte budget.
    #[tool(description = "Compress a memory object down to a byte budget by evicting items (temporal, importance, or hybrid order). Returns the compacted memory and a report.")]
    async fn compress_memory(
        &self,
        Parameters(params): Parameters<CompressMemoryParams>,
    ) -> Result<String, String> {
        let strategy = match &params.strategy {
            Some(s) => s.parse::<CompressionStrategy>()?,
            None => self.config.compression.default_strategy,
        };
        let max_memory_size = params
            .max_memory_size
            .unwrap_or(self.config.compression.max_memory_size);
        let retention_threshold = params
            .retention_threshold
            .or(self.config.compression.retention_threshold);

        let memory = MemoryStructure::from_value(params.memory)
            .map_err(|e| format!("memory must be a JSON object: {e}"))?;

        tracing::info!(strategy = %strategy, max_memory_size, "compress_memory called");

        let result = tokio::task::spawn_blocking(move || {
            compression::compress(memory, strategy, retention_threshold, max_memory_size)
        })
        .await
        .map_err(|e| format!("compression task failed: {e}"))?;

        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for GanglionTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Ganglion stores embeddings for knowledge records and compresses agent memory. \
                 Use add_vector to index, search_vectors to query, save_index to persist, and \
                 compress_memory to fit a memory object into a byte budget."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
