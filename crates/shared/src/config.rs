//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger engine tuning.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// How many accounts a fleet recalculation processes at once.
    #[serde(default = "default_fleet_concurrency")]
    pub fleet_concurrency: usize,
    /// Per-account recalculation timeout in seconds.
    #[serde(default = "default_account_timeout")]
    pub account_timeout_secs: u64,
    /// How many times a recalculation is retried after a concurrent modification.
    #[serde(default = "default_consistency_retries")]
    pub consistency_retries: u32,
    /// Recompute the chain inside the insert transaction when a movement is backdated.
    #[serde(default = "default_repair_on_backdated_insert")]
    pub repair_on_backdated_insert: bool,
}

fn default_fleet_concurrency() -> usize {
    4
}

fn default_account_timeout() -> u64 {
    30
}

fn default_consistency_retries() -> u32 {
    1
}

fn default_repair_on_backdated_insert() -> bool {
    true
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fleet_concurrency: default_fleet_concurrency(),
            account_timeout_secs: default_account_timeout(),
            consistency_retries: default_consistency_retries(),
            repair_on_backdated_insert: default_repair_on_backdated_insert(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SALDO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
