use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Centralized configuration for the rewear server and CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewearConfig {
    pub server: ServerSection,
    pub database: DatabaseConfig,
    pub marketplace: MarketplaceRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    pub cors_permissive: bool,
    pub request_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string; `${VAR}` references are expanded
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// Tunable marketplace constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceRules {
    /// Balance granted to a user on first sign-in
    pub starting_points: i32,
    /// Points paid to an owner when their listing is approved
    pub approval_bonus: i32,
    /// Number of items on the featured shelf
    pub featured_limit: u32,
}

impl Default for MarketplaceRules {
    fn default() -> Self {
        Self {
            starting_points: 100,
            approval_bonus: 10,
            featured_limit: 6,
        }
    }
}

impl RewearConfig {
    /// Load config from `path`, or from ~/.rewear/config.toml when `path` is None.
    ///
    /// A missing default file yields defaults; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config not found at {:?}", p);
                }
                p.to_path_buf()
            }
            None => {
                let default_path = Self::config_path();
                if !default_path.exists() {
                    tracing::debug!(
                        path = %default_path.display(),
                        "no config file, using defaults"
                    );
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path)
            .context(format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::from_toml_str(&content)
            .context(format!("Failed to load config file: {:?}", config_path))?;

        Ok(config)
    }

    /// Parse, expand and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).context("Failed to parse config file (invalid TOML)")?;

        config.expand_variables();
        config.validate()?;

        Ok(config)
    }

    /// Get config file path: ~/.rewear/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rewear/config.toml")
    }

    /// Expand ${VAR} references from the environment
    fn expand_variables(&mut self) {
        if let Some(ref url) = self.database.url {
            let expanded = expand_env(url);
            self.database.url = if expanded.trim().is_empty() {
                None
            } else {
                Some(expanded)
            };
        }
    }

    pub fn validate(&self) -> std::result::Result<(), CoreError> {
        if self.database.max_connections == 0 {
            return Err(CoreError::config("database.max_connections must be at least 1"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(CoreError::config("server.request_timeout_secs must be at least 1"));
        }
        let rules = &self.marketplace;
        if rules.starting_points < 0 {
            return Err(CoreError::config("marketplace.starting_points cannot be negative"));
        }
        if rules.approval_bonus < 0 {
            return Err(CoreError::config("marketplace.approval_bonus cannot be negative"));
        }
        if !(1..=100).contains(&rules.featured_limit) {
            return Err(CoreError::config("marketplace.featured_limit must be within 1..=100"));
        }
        Ok(())
    }
}

/// Replace every `${NAME}` with the value of the environment variable NAME.
/// Unset variables expand to an empty string; an unterminated `${` is kept as-is.
fn expand_env(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                result.push_str(&env::var(name).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_gives_defaults() {
        let config = RewearConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.bind.port(), 3030);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.marketplace, MarketplaceRules::default());
        assert_eq!(config.marketplace.approval_bonus, 10);
        assert_eq!(config.marketplace.starting_points, 100);
        assert_eq!(config.marketplace.featured_limit, 6);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = RewearConfig::from_toml_str(
            r#"
            [server]
            bind = "0.0.0.0:8080"

            [marketplace]
            approval_bonus = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.marketplace.approval_bonus, 25);
        assert_eq!(config.marketplace.featured_limit, 6);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(RewearConfig::from_toml_str("[marketplace]\nfeatured_limit = 0").is_err());
        assert!(RewearConfig::from_toml_str("[marketplace]\napproval_bonus = -1").is_err());
        assert!(RewearConfig::from_toml_str("[database]\nmax_connections = 0").is_err());
        assert!(RewearConfig::from_toml_str("[server]\nbind = \"not an address\"").is_err());
    }

    #[test]
    fn expands_environment_references() {
        env::set_var("REWEAR_TEST_DB_HOST", "db.internal");
        let config = RewearConfig::from_toml_str(
            "[database]\nurl = \"postgres://${REWEAR_TEST_DB_HOST}/rewear\"",
        )
        .unwrap();
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://db.internal/rewear")
        );
    }

    #[test]
    fn unset_reference_clears_url() {
        let config =
            RewearConfig::from_toml_str("[database]\nurl = \"${REWEAR_TEST_SURELY_UNSET}\"")
                .unwrap();
        assert!(config.database.url.is_none());
    }

    #[test]
    fn expand_env_keeps_unterminated_reference() {
        assert_eq!(expand_env("abc${def"), "abc${def");
        assert_eq!(expand_env("plain"), "plain");
    }

    #[test]
    fn load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\ncors_permissive = true").unwrap();

        let config = RewearConfig::load(Some(file.path())).unwrap();
        assert!(config.server.cors_permissive);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(RewearConfig::load(Some(&missing)).is_err());
    }
}
