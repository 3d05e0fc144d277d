//! offshell-agent entry point.
//!
//! Boots the offline agent from the bootstrap payload, brings the cache up
//! to date, and serves the agent's tools over MCP stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offshell_client::{Agent, FetchClient, FetchConfig, Lifecycle};
use offshell_core::{AppConfig, Bootstrap, CacheDb, Manifest};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
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
    let origin = config.origin_url()?;

    let bootstrap = Bootstrap::load(&config.bootstrap_path).await?;
    let manifest = Manifest::new(bootstrap, &origin)?;

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let store = db.named(manifest.cache_name());
    let agent = Arc::new(Agent::with_database(manifest, &db, network.clone()));

    tracing::info!(
        cache = agent.manifest().cache_name(),
        origin = %origin,
        db = %config.db_path.display(),
        "Starting offshell-agent on stdio transport"
    );

    if config.auto_install {
        match agent.install().await {
            Ok(report) => {
                tracing::info!(
                    refreshed = report.refreshed.len(),
                    unchanged = report.unchanged.len(),
                    failed = report.failed.len(),
                    "install settled"
                );
                let reaped = agent.activate().await?;
                tracing::info!(removed = reaped.removed.len(), failed = reaped.failed.len(), "activate settled");
            }
            Err(e) => tracing::warn!(error = %e, "install failed; agent stays out of traffic until agent_install"),
        }
    }

    let handler = handler::OffshellServer::new(agent.clone(), store, network);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    agent.shutdown().await;

    Ok(())
}
