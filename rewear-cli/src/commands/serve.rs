//! HTTP server command
//!
//! Runs the marketplace API against PostgreSQL, or against a throwaway
//! in-memory store with `--in-memory`.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rewear_core::RewearConfig;
use rewear_server::db::schema;
use rewear_server::{run_server, MarketplaceStore, MemoryStore, ServerConfig};

use super::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: server.bind from config, else 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Keep all data in memory; nothing survives a restart
    #[arg(long)]
    pub in_memory: bool,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Flags override the `[server]` section of the config file.
fn server_config(args: &ServeArgs, config: &RewearConfig) -> ServerConfig {
    let mut server = ServerConfig::from(&config.server);
    if let Some(bind) = args.bind {
        server.bind_addr = bind;
    }
    server.cors_permissive |= args.cors_permissive;
    server
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn run_serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let server = server_config(&args, &config);

    let store: Arc<dyn MarketplaceStore> = if args.in_memory {
        tracing::warn!("using in-memory store, data is lost on shutdown");
        Arc::new(MemoryStore::new(config.marketplace))
    } else {
        let store = super::connect(args.database, &config).await?;
        schema::run(store.pool())
            .await
            .context("Failed to apply database schema")?;
        Arc::new(store)
    };

    tracing::info!(bind = %server.bind_addr, "starting rewear server");
    run_server(store, server).await.context("Server error")?;

    Ok(())
}
