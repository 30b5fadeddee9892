//! Configuration management for logsift
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use logsift::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Reading logs from: {}", config.input.prefix);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `LOGSIFT__<section>__<key>`
//!
//! Examples:
//! - `LOGSIFT__INPUT__PREFIX=logs/2024/06`
//! - `LOGSIFT__LOOKUP__CONCURRENCY=8`
//! - `LOGSIFT__CACHE__RETRY_CACHED_FAILURES=false`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/logsift.toml`.
//! This can be overridden using the `LOGSIFT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use models::{
    AggregateConfig, BotConfig, CacheConfig, CleanConfig, Config, InputConfig, LookupConfig,
    OutputConfig, StoreConfig, StoreProvider,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`LOGSIFT__*`)
    /// 2. TOML file (default: `config/logsift.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (zero concurrency, blank patterns, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
