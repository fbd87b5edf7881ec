//! precios-offline server entry point.
//!
//! Boots the page and worker contexts, then serves the MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use precios_core::AppConfig;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.version_tag(),
        db = %config.db_path.display(),
        "Starting precios-offline on stdio transport"
    );

    let state = Arc::new(state::AppState::bootstrap(config).await?);
    let handler = handler::PreciosServer::new(state.clone());
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    match Arc::try_unwrap(state) {
        Ok(state) => state.shutdown().await,
        Err(_) => tracing::debug!("state still shared at exit"),
    }

    Ok(())
}
