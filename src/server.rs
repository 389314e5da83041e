//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that open the vector store
//! once and wire it into the MCP tool handler.

use anyhow::Result;
use ganglion::config::GanglionConfig;
use ganglion::vector::{self, VectorStore};
use rmcp::ServiceExt;
use std::sync::Arc;

use crate::tools::GanglionTools;

/// Shared setup: open (or create) the vector store. Returns (store, config) wrapped
/// in Arc for sharing.
fn setup_shared_state(config: GanglionConfig) -> (Arc<VectorStore>, Arc<GanglionConfig>) {
    let store = vector::global(&config);
    match store.stats() {
        Ok(stats) => tracing::info!(
            count = stats.count,
            capacity = stats.capacity,
            dimension = stats.dimension,
            "vector store ready"
        ),
        Err(e) => tracing::warn!(error = %e, "vector store stats unavailable"),
    }
    (store, Arc::new(config))
}

/// Save on shutdown so inserts made during the session survive a restart.
fn save_on_shutdown(store: &VectorStore) {
    if let Err(e) = store.save() {
        tracing::error!(error = %e, "failed to save vector store on shutdown");
    }
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: GanglionConfig) -> Result<()> {
    tracing::info!("starting Ganglion MCP server on stdio");

    let (store, config) = setup_shared_state(config);

    let tools = GanglionTools::new(Arc::clone(&store), config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    save_on_shutdown(&store);
    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: GanglionConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting Ganglion MCP server on HTTP");

    let (store, config) = setup_shared_state(config);
    let service_store = Arc::clone(&store);

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(GanglionTools::new(service_store.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    save_on_shutdown(&store);
    Ok(())
}
