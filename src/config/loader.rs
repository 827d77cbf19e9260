//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered in order, later layers
//! overriding earlier ones:
//!
//! 1. `config/sieve.toml` (optional)
//! 2. `config/sieve.{environment}.toml` (optional)
//! 3. `SIEVE__*` environment variables, e.g. `SIEVE__QUERY__DEFAULT_PAGE_SIZE=25`

use super::error::{ConfigResult, ConfigurationError};
use super::SieveConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Loaded, validated configuration plus the environment it was loaded for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: SieveConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::build_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            environment = environment,
            default_page_size = config.query.default_page_size,
            single_value_in_as_eq = config.query.single_value_in_as_eq,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
        }))
    }

    /// Wrap an already-built configuration (tests, embedding)
    pub fn from_config(config: SieveConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &SieveConfig {
        &self.config
    }

    /// Environment the configuration was loaded for
    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn build_config(config_directory: &Path, environment: &str) -> ConfigResult<SieveConfig> {
        let base = config_directory.join("sieve.toml");
        let overlay = config_directory.join(format!("sieve.{environment}.toml"));

        Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(overlay).required(false))
            .add_source(
                Environment::with_prefix("SIEVE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|raw| raw.try_deserialize::<SieveConfig>())
            .map_err(|e| ConfigurationError::load_error(environment, e))
    }

    /// Detect the active environment from environment variables
    pub fn detect_environment() -> String {
        env::var("SIEVE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }
}
