mod config;

use std::sync::Arc;

use anyhow::Context;
use bucketfs_tools::{
    resolver::ContentResolver,
    server::{RouterService, Server, transport::StdioTransport},
    service::FileSystemService,
    storage::AppwriteGateway,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is optional; real environment variables take precedence.
    dotenvy::dotenv().ok();

    // Stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Cli::parse()
        .into_config()
        .context("invalid configuration")?;
    let endpoint = config.storage.endpoint.clone();

    let gateway = AppwriteGateway::new(config.storage).context("failed to build storage client")?;
    tracing::info!(
        %endpoint,
        bucket = gateway.bucket_id(),
        "Starting bucketfs MCP server"
    );
    let service = FileSystemService::new(
        Arc::new(gateway),
        ContentResolver::new(config.decode_timeout),
    );

    Server::new(RouterService(service))
        .run(StdioTransport::stdio())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
