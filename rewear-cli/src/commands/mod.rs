//! Command implementations for the rewear CLI

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use rewear_core::RewearConfig;
use rewear_server::db::create_pool_with_options;
use rewear_server::PgStore;

pub mod admin;
pub mod migrate;
pub mod serve;
pub mod stats;

pub use admin::run_admin;
pub use migrate::run_migrate;
pub use serve::run_serve;
pub use stats::run_stats;

/// Connection flags shared by the commands that talk to PostgreSQL
#[derive(Parser, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Database URL (overrides config file)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Flag (or DATABASE_URL) first, then `database.url` from the config file.
pub(crate) fn resolve_database_url(flag: Option<String>, config: &RewearConfig) -> Result<String> {
    flag.filter(|url| !url.trim().is_empty())
        .or_else(|| config.database.url.clone())
        .context(
            "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, ~/.rewear/.env \
             or database.url in ~/.rewear/config.toml",
        )
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<RewearConfig> {
    RewearConfig::load(path).context("Failed to load rewear config")
}

/// Open a PostgreSQL-backed store, pool sized from the config file.
pub(crate) async fn connect(args: DatabaseArgs, config: &RewearConfig) -> Result<PgStore> {
    let url = resolve_database_url(args.database_url, config)?;
    let pool = create_pool_with_options(&url, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;
    Ok(PgStore::new(pool, config.marketplace))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_url(url: Option<&str>) -> RewearConfig {
        let mut config = RewearConfig::default();
        config.database.url = url.map(str::to_string);
        config
    }

    #[test]
    fn flag_wins_over_config() {
        let config = config_with_url(Some("postgres://config/db"));
        let url = resolve_database_url(Some("postgres://flag/db".into()), &config).unwrap();
        assert_eq!(url, "postgres://flag/db");
    }

    #[test]
    fn blank_flag_falls_back_to_config() {
        let config = config_with_url(Some("postgres://config/db"));
        let url = resolve_database_url(Some("  ".into()), &config).unwrap();
        assert_eq!(url, "postgres://config/db");
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = resolve_database_url(None, &config_with_url(None)).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL not set"));
    }
}
