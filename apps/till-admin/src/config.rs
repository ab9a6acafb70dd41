//! Admin CLI configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use till_ledger::LedgerConfig;

/// till-admin configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,

    /// Ledger tunables (`TILL_*` variables)
    pub ledger: LedgerConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("TILL_DATABASE_PATH").unwrap_or_else(|| "./till.db".to_string());
        if database_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue("TILL_DATABASE_PATH".to_string()));
        }

        Ok(AdminConfig {
            database_path: PathBuf::from(database_path),
            log_filter: lookup("TILL_LOG").unwrap_or_else(|| "info,sqlx=warn".to_string()),
            ledger: LedgerConfig::from_lookup(&lookup)?,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Ledger(#[from] till_ledger::ConfigError),
}
