//! linkcard server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use linkcard_client::{FsVault, ParserFactory, Session, Vault};
use linkcard_core::AppConfig;

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

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(parsers = ?config.parsers, max_concurrency = config.max_concurrency, "Starting linkcard server on stdio transport");

    let vault: Option<Arc<dyn Vault>> =
        config.vault_path.as_ref().map(|root| Arc::new(FsVault::new(root)) as Arc<dyn Vault>);

    let session = Session::new(&config, vault.clone()).context("failed to build HTTP client")?;
    let session = attach_renderer(session, &config).await;

    let mut factory = ParserFactory::new(config, session).with_location("mcp");
    if let Some(vault) = vault {
        factory = factory.with_vault(vault);
    }

    let handler = handler::LinkCardServer::new(factory);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

#[cfg(feature = "render")]
async fn attach_renderer(session: Session, config: &AppConfig) -> Session {
    if !config.render_enabled {
        return session;
    }

    match linkcard_client::HeadlessRenderer::new().await {
        Ok(renderer) => session.with_renderer(Arc::new(renderer)),
        Err(e) => {
            tracing::warn!("headless rendering unavailable, using plain HTTP: {}", e);
            session
        }
    }
}

#[cfg(not(feature = "render"))]
async fn attach_renderer(session: Session, config: &AppConfig) -> Session {
    if config.render_enabled {
        tracing::warn!("render_enabled is set but this build lacks the render feature");
    }
    session
}
