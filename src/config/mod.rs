use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::contracts;
use crate::network;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Chain the client is allowed to write to. Anything else is a wrong network.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// JSON-RPC endpoint (HTTP).
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    /// MockUSDC staking token.
    #[serde(default = "default_token_address")]
    pub token: String,
    #[serde(default = "default_factory_address")]
    pub factory: String,
    /// The only address allowed to see the contest creation UI.
    #[serde(default = "default_admin_address")]
    pub admin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Hex private key used to sign writes. Env only (MOMENTUM_PRIVATE_KEY),
    /// never read from the config file.
    #[serde(skip)]
    pub private_key: String,
    /// Wallet connector project id, passed through to browser clients.
    #[serde(default = "default_walletconnect_project_id")]
    pub walletconnect_project_id: String,
}

/// Refresh intervals for polled reads, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_balance_secs")]
    pub balance_secs: u64,
    #[serde(default = "default_allowance_secs")]
    pub allowance_secs: u64,
    #[serde(default = "default_all_contests_secs")]
    pub all_contests_secs: u64,
    #[serde(default = "default_active_contests_secs")]
    pub active_contests_secs: u64,
    #[serde(default = "default_stats_secs")]
    pub stats_secs: u64,
    #[serde(default = "default_pool_secs")]
    pub pool_secs: u64,
    #[serde(default = "default_resolution_secs")]
    pub resolution_secs: u64,
    #[serde(default = "default_events_secs")]
    pub events_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_chain_id() -> u64 {
    network::HELLA_CHAIN_ID
}
fn default_rpc_url() -> String {
    network::HELLA_RPC_URL.to_string()
}
fn default_explorer_url() -> String {
    network::HELLA_EXPLORER_URL.to_string()
}
fn default_token_address() -> String {
    contracts::MOCK_USDC_ADDRESS.to_string()
}
fn default_factory_address() -> String {
    contracts::CONTEST_FACTORY_ADDRESS.to_string()
}
fn default_admin_address() -> String {
    contracts::ADMIN_ADDRESS.to_string()
}
fn default_walletconnect_project_id() -> String {
    "YOUR_WALLETCONNECT_PROJECT_ID".to_string()
}
fn default_balance_secs() -> u64 {
    10
}
fn default_allowance_secs() -> u64 {
    5
}
fn default_all_contests_secs() -> u64 {
    30
}
fn default_active_contests_secs() -> u64 {
    15
}
fn default_stats_secs() -> u64 {
    30
}
fn default_pool_secs() -> u64 {
    10
}
fn default_resolution_secs() -> u64 {
    5
}
fn default_events_secs() -> u64 {
    5
}
fn default_dashboard_addr() -> String {
    "127.0.0.1:3030".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            rpc_url: default_rpc_url(),
            explorer_url: default_explorer_url(),
        }
    }
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            token: default_token_address(),
            factory: default_factory_address(),
            admin: default_admin_address(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key: String::new(),
            walletconnect_project_id: default_walletconnect_project_id(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            balance_secs: default_balance_secs(),
            allowance_secs: default_allowance_secs(),
            all_contests_secs: default_all_contests_secs(),
            active_contests_secs: default_active_contests_secs(),
            stats_secs: default_stats_secs(),
            pool_secs: default_pool_secs(),
            resolution_secs: default_resolution_secs(),
            events_secs: default_events_secs(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_dashboard_addr(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            contracts: ContractsConfig::default(),
            wallet: WalletConfig::default(),
            polling: PollingConfig::default(),
            dashboard: DashboardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PollingConfig {
    pub fn balance(&self) -> Duration {
        Duration::from_secs(self.balance_secs.max(1))
    }
    pub fn allowance(&self) -> Duration {
        Duration::from_secs(self.allowance_secs.max(1))
    }
    pub fn all_contests(&self) -> Duration {
        Duration::from_secs(self.all_contests_secs.max(1))
    }
    pub fn active_contests(&self) -> Duration {
        Duration::from_secs(self.active_contests_secs.max(1))
    }
    pub fn stats(&self) -> Duration {
        Duration::from_secs(self.stats_secs.max(1))
    }
    pub fn pool(&self) -> Duration {
        Duration::from_secs(self.pool_secs.max(1))
    }
    pub fn resolution(&self) -> Duration {
        Duration::from_secs(self.resolution_secs.max(1))
    }
    pub fn events(&self) -> Duration {
        Duration::from_secs(self.events_secs.max(1))
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Hardcoded fallbacks overlaid with the environment (no file needed).
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are ignored so a blank
    /// `.env` entry falls back to the configured default.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("HELLA_RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Some(raw) = get("HELLA_CHAIN_ID") {
            self.network.chain_id = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "HELLA_CHAIN_ID".to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(addr) = get("MOCK_USDC_ADDRESS") {
            self.contracts.token = addr;
        }
        if let Some(addr) = get("CONTEST_FACTORY_ADDRESS") {
            self.contracts.factory = addr;
        }
        if let Some(addr) = get("ADMIN_ADDRESS") {
            self.contracts.admin = addr;
        }
        if let Some(id) = get("WALLETCONNECT_PROJECT_ID") {
            self.wallet.walletconnect_project_id = id;
        }
        // Secrets never live in the config file.
        if let Some(key) = get("MOMENTUM_PRIVATE_KEY") {
            self.wallet.private_key = key;
        }
        if let Some(addr) = get("MOMENTUM_DASHBOARD_ADDR") {
            self.dashboard.bind_addr = addr;
        }

        Ok(self)
    }

    pub fn has_signer(&self) -> bool {
        !self.wallet.private_key.trim().is_empty()
    }
}
