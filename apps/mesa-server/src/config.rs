//! # Server Configuration
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Read-only after startup.
//!
//! ## Environment Variables
//! - `MESA_BIND_ADDR`: listen address (default `0.0.0.0:8080`)
//! - `MESA_DB_PATH`: SQLite file (default `./mesa.db`)
//! - `MESA_DB_MAX_CONNECTIONS`: pool size (default 5)
//! - `MESA_CURRENCY_SYMBOL`: symbol reported to clients (default `$`)
//! - `MESA_MAX_SPLIT_SHARES`: venue cap on equal-split shares (default 20)

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

use mesa_core::MAX_SPLIT_SHARES;

/// Log filter used when `RUST_LOG` is unset. Targets are crate names.
pub const DEFAULT_LOG_FILTER: &str = "info,mesa_server=debug,mesa_db=debug,mesa_core=debug,sqlx=warn";

/// Server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub db_max_connections: u32,
    pub currency_symbol: String,
    /// Venue cap on split shares; never above the core limit.
    pub max_split_shares: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: PathBuf::from("./mesa.db"),
            db_max_connections: 5,
            currency_symbol: "$".to_string(),
            max_split_shares: MAX_SPLIT_SHARES,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();

        if let Some(addr) = lookup("MESA_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MESA_BIND_ADDR".to_string()))?;
        }

        if let Some(path) = lookup("MESA_DB_PATH") {
            if path.trim().is_empty() {
                return Err(ConfigError::InvalidValue("MESA_DB_PATH".to_string()));
            }
            config.db_path = PathBuf::from(path);
        }

        if let Some(max) = lookup("MESA_DB_MAX_CONNECTIONS") {
            config.db_max_connections = max
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MESA_DB_MAX_CONNECTIONS".to_string()))?;
            if config.db_max_connections == 0 {
                return Err(ConfigError::OutOfRange {
                    key: "MESA_DB_MAX_CONNECTIONS".to_string(),
                    min: 1,
                    max: u32::MAX,
                });
            }
        }

        if let Some(symbol) = lookup("MESA_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(shares) = lookup("MESA_MAX_SPLIT_SHARES") {
            config.max_split_shares = shares
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MESA_MAX_SPLIT_SHARES".to_string()))?;
            if !(2..=MAX_SPLIT_SHARES).contains(&config.max_split_shares) {
                return Err(ConfigError::OutOfRange {
                    key: "MESA_MAX_SPLIT_SHARES".to_string(),
                    min: 2,
                    max: MAX_SPLIT_SHARES,
                });
            }
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("{key} must be between {min} and {max}")]
    OutOfRange { key: String, min: u32, max: u32 },
}
