//! Contract Navigator MCP server
//!
//! Reads JSON-RPC messages from stdin and writes responses to stdout. All
//! logging goes to stderr.

use contractnav_core::Config;
use contractnav_mcp::McpServer;
use contractnav_store::SpecStore;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var_os("CONTRACTNAV_CONFIG").map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // stdout carries protocol frames, so logs must stay on stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_directive())),
        )
        .init();

    tracing::info!("Starting MCP server...");

    let store = SpecStore::from_config(&config).await?;
    let server = McpServer::new(store);

    tracing::info!("Server connected and waiting for requests.");
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    Ok(())
}
