//! ruralcare-sw entry point.
//!
//! Boots the offline worker and exposes its events as MCP tools on the stdio
//! transport. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use ruralcare_core::{AppConfig, CacheDb};
use ruralcare_worker::{HttpOrigin, OriginConfig, Worker};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "starting ruralcare-sw on stdio transport");

    let db = CacheDb::open(&config.db_path, config.storage_quota_bytes).await?;
    let origin = Arc::new(HttpOrigin::new(OriginConfig::from(&config))?);
    let worker = Arc::new(Worker::new(&config, db, origin)?);
    if worker.resume().await? {
        tracing::info!(status = ?worker.status(), "worker already installed");
    }

    let handler = handler::WorkerServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
