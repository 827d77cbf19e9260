//! # Sieve Configuration
//!
//! Engine configuration: pagination bounds, flat-grammar compatibility switches and the
//! database connection used by the PostgreSQL session.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sieve_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! let page_size = manager.config().query.default_page_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::query_builder::pagination::{
    DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE, UNBOUNDED_PAGE_SIZE,
};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/sieve.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SieveConfig {
    /// Query compilation and pagination settings
    pub query: QueryConfig,

    /// Database connection settings
    pub database: DatabaseConfig,
}

/// Query compilation and pagination settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size applied to flat queries that do not name one
    pub default_page_size: u32,
    /// Highest page number a caller may request
    pub max_page: u32,
    /// Largest page size a caller may request
    pub max_page_size: u32,
    /// Page size used by helper call sites that want every matching row
    pub unbounded_page_size: u32,
    /// Rewrite a flat `field__in` with exactly one value into an equality predicate.
    ///
    /// Some storage engines evaluate single-element set membership unreliably; turn this off
    /// for backends that do not need the rewrite.
    pub single_value_in_as_eq: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page: MAX_PAGE,
            max_page_size: MAX_PAGE_SIZE,
            unbounded_page_size: UNBOUNDED_PAGE_SIZE,
            single_value_in_as_eq: true,
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; falls back to `DATABASE_URL` when unset
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// Resolve the connection URL, preferring explicit configuration over `DATABASE_URL`
    pub fn database_url(&self) -> ConfigResult<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or_else(|| {
                ConfigurationError::database_config_error(
                    "no database.url configured and DATABASE_URL is not set",
                )
            })
    }
}

impl SieveConfig {
    /// Reject configurations the engine cannot honour
    pub fn validate(&self) -> ConfigResult<()> {
        let query = &self.query;
        if query.max_page == 0 {
            return Err(ConfigurationError::invalid_value(
                "query.max_page",
                "0",
                "must be at least 1",
            ));
        }
        if query.default_page_size > query.max_page_size {
            return Err(ConfigurationError::invalid_value(
                "query.default_page_size",
                query.default_page_size.to_string(),
                format!("exceeds query.max_page_size ({})", query.max_page_size),
            ));
        }
        if query.unbounded_page_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "query.unbounded_page_size",
                "0",
                "must be at least 1",
            ));
        }
        if query.unbounded_page_size > query.max_page_size {
            return Err(ConfigurationError::invalid_value(
                "query.unbounded_page_size",
                query.unbounded_page_size.to_string(),
                format!("exceeds query.max_page_size ({})", query.max_page_size),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
