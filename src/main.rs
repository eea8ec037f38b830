mod analysis;
mod audio;
mod cli;
mod error;
mod filters;
mod genre;
mod normalize;
mod plex;
mod stats;
mod tools;
mod types;

use std::sync::Arc;

use clap::Parser;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the MCP transport.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = cli::Cli::parse().into_config()?;
    let plex = plex::PlexClient::new(&config)?;
    tracing::info!(url = %config.base_url, "starting plexbox");

    let server = tools::PlexboxServer::new(Arc::new(plex));
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
