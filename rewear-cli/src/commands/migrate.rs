//! Schema bootstrap command

use std::path::Path;

use anyhow::{Context, Result};
use rewear_server::db::schema;

use super::DatabaseArgs;

/// Create any missing tables and indexes. Safe to run repeatedly.
pub async fn run_migrate(args: DatabaseArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let store = super::connect(args, &config).await?;

    schema::run(store.pool())
        .await
        .context("Failed to apply database schema")?;

    tracing::info!("schema is up to date");
    println!("✅ Schema applied");
    Ok(())
}
