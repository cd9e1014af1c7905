//! Moderator management
//!
//! Admin rights are never granted over HTTP; this command is the only way in.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rewear_server::{MarketplaceStore, StoreError};

use super::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommands,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Make a user an admin
    Grant(UserArg),
    /// Remove a user's admin rights
    Revoke(UserArg),
}

#[derive(Parser, Debug)]
pub struct UserArg {
    /// User id as issued by the identity provider
    pub user_id: String,
}

pub async fn run_admin(args: AdminArgs, config_path: Option<&Path>) -> Result<()> {
    let (user_id, grant) = match args.command {
        AdminCommands::Grant(user) => (user.user_id, true),
        AdminCommands::Revoke(user) => (user.user_id, false),
    };

    let config = super::load_config(config_path)?;
    let store = super::connect(args.database, &config).await?;

    let user = match store.set_admin(&user_id, grant).await {
        Ok(user) => user,
        Err(StoreError::NotFound { .. }) => {
            anyhow::bail!("No user with id {user_id:?}. They must sign in once before promotion.")
        }
        Err(e) => return Err(e).context("Failed to update admin flag"),
    };

    tracing::info!(user_id = %user.id, is_admin = user.is_admin, "admin flag updated");
    if user.is_admin {
        println!("✅ {} is now an admin", user.id);
    } else {
        println!("✅ {} is no longer an admin", user.id);
    }
    Ok(())
}
