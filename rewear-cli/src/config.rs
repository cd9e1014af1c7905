use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rewear_core::RewearConfig;
use url::Url;

const TEMPLATE: &str = include_str!("../../.rewear-config.template.toml");

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a commented config file
    Init(InitArgs),
    /// Show config file path
    Path,
    /// Print the effective configuration (defaults filled in)
    Show,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

/// `--config` wins over ~/.rewear/config.toml for every subcommand.
pub fn run_config(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(RewearConfig::config_path);

    match args.command {
        ConfigCommands::Init(args) => run_init(&path, args.force),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(config_path),
    }
}

fn run_init(path: &PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("Config already exists at {:?}\n\nUse --force to overwrite", path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create config directory: {:?}", parent))?;
    }

    std::fs::write(path, TEMPLATE).context(format!("Failed to write config file: {:?}", path))?;

    println!("✅ Created config at: {:?}", path);
    println!("\nNext steps:");
    println!("  1. Edit the config: $EDITOR {:?}", path);
    println!("  2. Set DATABASE_URL (environment or ~/.rewear/.env)");
    println!("  3. Run: rewear migrate");
    Ok(())
}

/// Mask the password in a connection string before it is printed.
fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                // only fails for URLs without a host, which carry no password
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<unparsable, hidden>".to_string(),
    }
}

fn run_show(config_path: Option<&Path>) -> Result<()> {
    let mut config = RewearConfig::load(config_path)?;
    config.database.url = config.database.url.as_deref().map(redact_database_url);

    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?;
    println!("{}", toml_str);
    Ok(())
}
