//! Bot configuration
//!
//! Values come from a TOML file (defaults when it is missing), then from
//! command line flags and their environment variables, which win.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{BotError, BotResult};

/// Command line interface
#[derive(Parser, Debug, Clone)]
#[command(name = "carebot")]
#[command(about = "Caring challenge chat bot")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "carebot.toml")]
    pub config: PathBuf,

    /// Redis connection URL (overrides config file)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Storage backend (overrides config file)
    #[arg(long, env = "CAREBOT_BACKEND", value_enum)]
    pub backend: Option<BackendKind>,

    /// Key namespace for all bot data (overrides config file)
    #[arg(long, env = "CAREBOT_NAMESPACE")]
    pub namespace: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Which key-value backend holds bot state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process memory; state is lost on exit
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub drafts: DraftConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Used when `kind = "redis"`
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            redis_url: default_redis_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Prefix scoping every stored key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Bot account name, shown as the sender of console replies
    #[serde(default)]
    pub username: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            username: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftConfig {
    /// Seconds before an unfinished draft is discarded
    #[serde(default = "default_draft_ttl")]
    pub ttl_secs: u64,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_draft_ttl(),
        }
    }
}

fn default_redis_url() -> String { "redis://127.0.0.1:6379".to_string() }
fn default_namespace() -> String { "carebot".to_string() }
fn default_draft_ttl() -> u64 { 900 }

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> BotResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load(path: &Path) -> BotResult<Self> {
        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load the file named by `cli` and apply its overrides.
    pub fn from_cli(cli: &Cli) -> BotResult<Self> {
        let mut config = Self::load(&cli.config)?;
        config.apply_overrides(cli);
        config.validate().map_err(BotError::Config)?;
        Ok(config)
    }

    /// Apply CLI overrides.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(kind) = cli.backend {
            self.backend.kind = kind;
        }
        if let Some(url) = &cli.redis_url {
            self.backend.redis_url = url.clone();
        }
        if let Some(namespace) = &cli.namespace {
            self.bot.namespace = namespace.clone();
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bot.namespace.trim().is_empty() {
            return Err("bot.namespace must not be empty".to_string());
        }

        if self.drafts.ttl_secs == 0 {
            return Err("drafts.ttl_secs must be greater than zero".to_string());
        }

        if self.backend.kind == BackendKind::Redis
            && !(self.backend.redis_url.starts_with("redis://")
                || self.backend.redis_url.starts_with("rediss://"))
        {
            return Err(format!(
                "backend.redis_url must be a redis:// URL, got {}",
                self.backend.redis_url
            ));
        }

        Ok(())
    }

    pub fn draft_ttl(&self) -> Duration {
        Duration::from_secs(self.drafts.ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("carebot").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert_eq!(config.bot.namespace, "carebot");
        assert_eq!(config.drafts.ttl_secs, 900);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::from_toml("[bot]\nnamespace = \"file\"\n").unwrap();
        config.apply_overrides(&cli(&[
            "--backend",
            "redis",
            "--redis-url",
            "redis://cache:6379",
            "--namespace",
            "flag",
        ]));

        assert_eq!(config.backend.kind, BackendKind::Redis);
        assert_eq!(config.backend.redis_url, "redis://cache:6379");
        assert_eq!(config.bot.namespace, "flag");
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = Config::default();
        config.bot.namespace = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.drafts.ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.kind = BackendKind::Redis;
        config.backend.redis_url = "http://cache".to_string();
        assert!(config.validate().unwrap_err().contains("redis://"));
    }
}
