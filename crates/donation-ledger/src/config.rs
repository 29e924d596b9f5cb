//! Configuration management for donation-ledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::sync::OnceLock;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::currency::DecimalSeparator;
use crate::error::{Error, Result};
use crate::status::{default_approval_statuses, default_valid_statuses};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "donation-ledger";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "ledger.db";

/// Allowed shape of a status name.
const STATUS_NAME_PATTERN: &str = r"^[a-z0-9][a-z0-9_-]*$";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DONATION_LEDGER_`)
/// 2. TOML config file at `~/.config/donation-ledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Currency configuration.
    pub currency: CurrencyConfig,
    /// Donation status configuration.
    pub statuses: StatusConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/donation-ledger/ledger.db`
    pub database_path: Option<PathBuf>,
}

/// Currency-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    /// Decimal separator the site displays amounts with (`"."` or `","`).
    pub decimal_separator: DecimalSeparator,
}

/// Donation status configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Every status a donation may have.
    pub valid: Vec<String>,
    /// Statuses whose donations count toward totals.
    pub approval: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            valid: default_valid_statuses(),
            approval: default_approval_statuses(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `DONATION_LEDGER_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("DONATION_LEDGER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.statuses.valid.is_empty() {
            return Err(Error::ConfigValidation {
                message: "statuses.valid must list at least one status".to_string(),
            });
        }

        if self.statuses.approval.is_empty() {
            return Err(Error::ConfigValidation {
                message: "statuses.approval must list at least one status".to_string(),
            });
        }

        let pattern = status_name_pattern();
        for status in self.statuses.valid.iter().chain(&self.statuses.approval) {
            if !pattern.is_match(status) {
                return Err(Error::ConfigValidation {
                    message: format!("invalid status name: {status:?}"),
                });
            }
        }

        for status in &self.statuses.approval {
            if !self.statuses.valid.contains(status) {
                return Err(Error::ConfigValidation {
                    message: format!("approval status {status} is not listed in statuses.valid"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

fn status_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(STATUS_NAME_PATTERN).expect("Invalid status name pattern"))
}
