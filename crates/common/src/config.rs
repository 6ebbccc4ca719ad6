//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Messaging configuration.
    #[serde(default)]
    pub messaging: MessagingConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Messaging domain configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Default page size for thread listings.
    #[serde(default = "default_thread_page_size")]
    pub thread_page_size: u64,
    /// Maximum message body length in characters.
    #[serde(default = "default_max_body_length")]
    pub max_body_length: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            thread_page_size: default_thread_page_size(),
            max_body_length: default_max_body_length(),
        }
    }
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_thread_page_size() -> u64 {
    30
}

const fn default_max_body_length() -> usize {
    65536
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `THREADLINE_ENV`)
    /// 3. Environment variables with `THREADLINE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("THREADLINE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("THREADLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("THREADLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
