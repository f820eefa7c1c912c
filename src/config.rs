//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `maker.toml` (or the file named by `MAKER_CONFIG`) into
//! strongly-typed structs. Every field has a default, so a missing file or
//! section is fine. Deployment knobs can then be overridden from the
//! environment with the historical variable names (`ENDPOINT_URL`,
//! `INTERVAL`, `CU_PRICE`, ...).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::exchange::default_program_id;
use crate::strategy::ladder::LadderConfig;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "maker.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub maker: MakerConfig,
    pub rpc: RpcConfig,
    pub fees: FeesConfig,
    pub ladder: LadderConfig,
    pub status: StatusConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MakerConfig {
    /// Key into the markets file (`mainnet`, `devnet`, ...).
    pub cluster: String,
    /// Market name to make. The first market of the cluster when unset.
    pub market: Option<String>,
    pub markets_file: String,
    /// Dex program override. Falls back to the market entry, then the
    /// cluster default.
    pub program_id: Option<String>,
    pub interval_ms: u64,
    pub wallet_path: String,
    /// Build and log orders without signing or sending them.
    pub dry_run: bool,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            cluster: "mainnet".to_string(),
            market: None,
            markets_file: "markets.json".to_string(),
            program_id: None,
            interval_ms: 2_000,
            wallet_path: "~/.config/solana/dev.json".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RpcConfig {
    pub endpoint: String,
    /// Commitment for reads and confirmations.
    pub commitment: String,
    pub timeout_secs: u64,
    pub blockhash_refresh_ms: u64,
    /// A blockhash older than this is still used but logged as stale.
    pub blockhash_max_age_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: "processed".to_string(),
            timeout_secs: 30,
            blockhash_refresh_ms: 1_000,
            blockhash_max_age_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeesConfig {
    /// Event-queue depth at which the priority price applies.
    pub priority_queue_limit: u64,
    /// Micro-lamports per compute unit on congested or priority markets.
    pub priority_cu_price: u64,
    pub cu_limit: u32,
    /// Micro-lamports per compute unit otherwise.
    pub cu_price: u64,
    /// Orders are sent one per transaction; this only has to be at least 1.
    pub max_tx_instructions: u32,
    /// Market names (or addresses) that always pay the priority price.
    pub priority_markets: Vec<String>,
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            priority_queue_limit: 100,
            priority_cu_price: 100_000,
            cu_limit: 50_000,
            cu_price: 0,
            max_tx_instructions: 1,
            priority_markets: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StatusConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1:8089".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            warn!(path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ENDPOINT_URL") {
            self.rpc.endpoint = v;
        }
        if let Some(v) = lookup("CLUSTER") {
            self.maker.cluster = v;
        }
        if let Some(v) = lookup("PROGRAM_ID") {
            self.maker.program_id = Some(v);
        }
        if let Some(v) = lookup("WALLET_PATH") {
            self.maker.wallet_path = v;
        }
        if let Some(v) = lookup("MARKETS_FILE") {
            self.maker.markets_file = v;
        }
        if let Some(v) = lookup("INTERVAL") {
            self.maker.interval_ms = parse_env("INTERVAL", &v)?;
        }
        if let Some(v) = lookup("PRIORITY_QUEUE_LIMIT") {
            self.fees.priority_queue_limit = parse_env("PRIORITY_QUEUE_LIMIT", &v)?;
        }
        if let Some(v) = lookup("PRIORITY_CU_PRICE") {
            self.fees.priority_cu_price = parse_env("PRIORITY_CU_PRICE", &v)?;
        }
        if let Some(v) = lookup("PRIORITY_CU_LIMIT") {
            self.fees.cu_limit = parse_env("PRIORITY_CU_LIMIT", &v)?;
        }
        if let Some(v) = lookup("MAX_TX_INSTRUCTIONS") {
            self.fees.max_tx_instructions = parse_env("MAX_TX_INSTRUCTIONS", &v)?;
        }
        if let Some(v) = lookup("CU_PRICE") {
            self.fees.cu_price = parse_env("CU_PRICE", &v)?;
        }
        if let Some(v) = lookup("PRIORITY_MARKETS") {
            self.fees.priority_markets = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    /// Reject settings the maker can't run with.
    pub fn validate(&self) -> Result<()> {
        if self.maker.interval_ms == 0 {
            bail!("maker.interval_ms must be positive");
        }
        if self.rpc.blockhash_refresh_ms == 0 {
            bail!("rpc.blockhash_refresh_ms must be positive");
        }
        if self.rpc.blockhash_refresh_ms >= self.maker.interval_ms {
            bail!(
                "rpc.blockhash_refresh_ms ({}) must be shorter than maker.interval_ms ({})",
                self.rpc.blockhash_refresh_ms,
                self.maker.interval_ms
            );
        }
        if self.fees.max_tx_instructions == 0 {
            bail!("fees.max_tx_instructions must be at least 1");
        }
        if self.fees.cu_limit == 0 {
            bail!("fees.cu_limit must be positive");
        }
        self.ladder
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid ladder: {e}"))?;
        self.status_addr()?;
        Ok(())
    }

    /// Dex program: explicit override, else the market entry's, else the
    /// cluster default.
    pub fn program_id(&self, market_program: Option<Pubkey>) -> Result<Pubkey> {
        match &self.maker.program_id {
            Some(id) => Pubkey::from_str(id)
                .map_err(|e| anyhow::anyhow!("invalid program id {id:?}: {e}")),
            None => Ok(market_program.unwrap_or_else(|| default_program_id(&self.maker.cluster))),
        }
    }

    /// Wallet path with a leading `~` expanded from `HOME`.
    pub fn wallet_path(&self) -> PathBuf {
        expand_home(&self.maker.wallet_path, std::env::var("HOME").ok().as_deref())
    }

    pub fn status_addr(&self) -> Result<SocketAddr> {
        self.status
            .bind
            .parse()
            .with_context(|| format!("Invalid status.bind address: {}", self.status.bind))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.maker.interval_ms)
    }

    pub fn blockhash_refresh(&self) -> Duration {
        Duration::from_millis(self.rpc.blockhash_refresh_ms)
    }

    pub fn blockhash_max_age(&self) -> Duration {
        Duration::from_secs(self.rpc.blockhash_max_age_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    /// Whether `name` or `address` appears in the priority market list.
    pub fn is_priority_market(&self, name: &str, address: &Pubkey) -> bool {
        let address = address.to_string();
        self.fees
            .priority_markets
            .iter()
            .any(|m| m == name || *m == address)
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {name}={value:?}: {e}"))
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => Path::new(home).join(rest),
        _ => PathBuf::from(path),
    }
}
