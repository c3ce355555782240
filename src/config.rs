//! Configuration management for the bridge client
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::awaiter::DepositWatchConfig;
use crate::chain::Pubkey;

use anyhow::{Context, Result};
use num_bigint::BigUint;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub ledger: LedgerConfig,
    pub explorer: Option<ExplorerConfig>,
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub watches: Vec<WatchConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchKind {
    /// EVM deposit seen through the explorer API
    Explorer,
    /// Ledger token account balance change
    Ledger,
}

/// One deposit to wait for.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub name: String,
    pub kind: WatchKind,
    #[serde(default)]
    pub address: String,
    /// Ledger watches only: watch the associated token account this wallet
    /// holds for `asset` instead of `address`
    pub owner: Option<String>,
    #[serde(default)]
    pub asset: String,
    /// Base units, decimal string
    pub amount: String,
    pub block_start: Option<u64>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    pub timeout_secs: Option<u64>,
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_health_check_interval() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    5_000
}

impl WatchConfig {
    pub fn to_watch_config(&self) -> Result<DepositWatchConfig> {
        let amount = BigUint::parse_bytes(self.amount.as_bytes(), 10)
            .with_context(|| format!("Watch {} has invalid amount {:?}", self.name, self.amount))?;

        let cfg = match (self.kind, &self.owner) {
            (WatchKind::Ledger, Some(owner)) => {
                let owner: Pubkey = owner
                    .parse()
                    .with_context(|| format!("Watch {} has invalid owner", self.name))?;
                let mint: Pubkey = self
                    .asset
                    .parse()
                    .with_context(|| format!("Watch {} has invalid mint", self.name))?;
                DepositWatchConfig::associated(&owner, &mint, amount)?
            }
            (_, Some(_)) => {
                anyhow::bail!("Watch {}: owner is only valid for ledger watches", self.name)
            }
            (_, None) if self.address.is_empty() => {
                anyhow::bail!("Watch {} has no address", self.name)
            }
            (_, None) => DepositWatchConfig::new(&self.address, &self.asset, amount),
        };

        let mut cfg = cfg.with_poll_interval(Duration::from_millis(self.poll_interval_ms));
        if let Some(block) = self.block_start {
            cfg = cfg.with_block_start(block);
        }
        if let Some(secs) = self.timeout_secs {
            cfg = cfg.with_timeout(Duration::from_secs(secs));
        }

        Ok(cfg)
    }
}

impl Settings {
    /// Load settings from `SOLANOID_CONFIG` or `config/default.toml`
    pub fn load() -> Result<Self> {
        let config_path = env::var("SOLANOID_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.ledger.rpc_url.is_empty() {
            anyhow::bail!("Ledger RPC URL is not configured");
        }

        let mut names = HashSet::new();
        for watch in &self.watches {
            if !names.insert(watch.name.as_str()) {
                anyhow::bail!("Watch {} is configured twice", watch.name);
            }
            if watch.kind == WatchKind::Explorer && self.explorer.is_none() {
                anyhow::bail!("Watch {} needs an [explorer] section", watch.name);
            }
            if watch.poll_interval_ms == 0 {
                anyhow::bail!("Watch {} has a zero poll interval", watch.name);
            }
            watch.to_watch_config()?;
        }

        if self.watches.is_empty() {
            tracing::warn!("No watches configured - nothing to await");
        }

        Ok(())
    }
}

/// Log output format, chosen with `SOLANOID_LOG_FORMAT` before the config loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        env::var("SOLANOID_LOG_FORMAT")
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// `json` (any case) selects JSON lines; anything else is text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("pattern is valid");
    }

    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
