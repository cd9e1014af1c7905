//! Marketplace totals, the same numbers as GET /api/admin/stats

use std::path::Path;

use anyhow::{Context, Result};
use rewear_server::MarketplaceStore;

use super::DatabaseArgs;

pub async fn run_stats(args: DatabaseArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let store = super::connect(args, &config).await?;

    let stats = store.stats().await.context("Failed to load stats")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
    );
    Ok(())
}
