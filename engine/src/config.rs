//! Engine configuration module.
//!
//! This module provides configuration loading for the engine binary from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `ENGINE_DATA_FILE`: Path of the database file (required)
//! - `ENGINE_CACHE_PAGES`: Number of pages the block cache may hold (default: `1024`)
//! - `ENGINE_LOG`: Log filter used when `RUST_LOG` is unset (default: `engine=info`)
//!
//! # Invariants
//!
//! - `cache_pages` is always greater than zero
//! - `log_filter` is never empty

use std::path::PathBuf;

use crate::storage::DEFAULT_POOL_CAPACITY;

/// Engine configuration.
///
/// # Post-conditions
///
/// When constructed via `from_env()`, `cache_pages > 0` and `data_file` is
/// non-empty. The file itself may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Database file read by lookups and written by `build`.
    pub data_file: PathBuf,
    /// Capacity of the block cache, in pages.
    pub cache_pages: usize,
    /// Fallback `tracing` filter directive.
    pub log_filter: String,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    pub const DATA_FILE_VAR: &'static str = "ENGINE_DATA_FILE";
    pub const CACHE_PAGES_VAR: &'static str = "ENGINE_CACHE_PAGES";
    pub const LOG_VAR: &'static str = "ENGINE_LOG";

    /// Default cache capacity in pages.
    pub const DEFAULT_CACHE_PAGES: usize = DEFAULT_POOL_CAPACITY;
    /// Default log filter.
    pub const DEFAULT_LOG_FILTER: &'static str = "engine=info";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `ENGINE_DATA_FILE` is not set or is empty
    /// - `ENGINE_CACHE_PAGES` is set but is not a positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_file = Self::load_data_file(&lookup)?;
        let cache_pages = Self::load_cache_pages(&lookup)?;
        let log_filter = Self::load_log_filter(&lookup);

        Ok(Self {
            data_file,
            cache_pages,
            log_filter,
        })
    }

    fn load_data_file(lookup: &impl Fn(&str) -> Option<String>) -> Result<PathBuf, ConfigError> {
        let path = lookup(Self::DATA_FILE_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(Self::DATA_FILE_VAR.to_string()))?;

        if path.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: Self::DATA_FILE_VAR.to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(PathBuf::from(path))
    }

    /// Returns the default if not set.
    fn load_cache_pages(lookup: &impl Fn(&str) -> Option<String>) -> Result<usize, ConfigError> {
        let Some(value) = lookup(Self::CACHE_PAGES_VAR) else {
            return Ok(Self::DEFAULT_CACHE_PAGES);
        };

        match value.parse::<usize>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
                name: Self::CACHE_PAGES_VAR.to_string(),
                message: format!("'{value}' is not a positive page count"),
            }),
            Ok(pages) => Ok(pages),
        }
    }

    fn load_log_filter(lookup: &impl Fn(&str) -> Option<String>) -> String {
        lookup(Self::LOG_VAR)
            .filter(|filter| !filter.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_LOG_FILTER.to_string())
    }
}
