//! Configuration management for the Commodity Reception Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with CRP_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{default_consistency_epsilon, CompletionPolicy};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Calculation engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Tolerance for `original - discount == final`
    pub consistency_epsilon: f64,

    /// Permit completing a batch that is already completed
    pub allow_batch_recompletion: bool,
}

impl EngineConfig {
    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let epsilon = decimal_epsilon(self.consistency_epsilon).map_err(|_| {
            ConfigError::Message(format!(
                "engine.consistency_epsilon is not a number: {}",
                self.consistency_epsilon
            ))
        })?;
        // Computed results may be off by one cent on half-cent ties
        if epsilon < default_consistency_epsilon() || epsilon >= Decimal::ONE {
            return Err(ConfigError::Message(format!(
                "engine.consistency_epsilon must be at least {} and below 1, got {}",
                default_consistency_epsilon(),
                epsilon
            )));
        }
        Ok(())
    }

    /// Only meaningful once `validate` has passed
    pub fn consistency_epsilon(&self) -> Decimal {
        decimal_epsilon(self.consistency_epsilon).unwrap_or_else(|_| default_consistency_epsilon())
    }

    pub fn completion_policy(&self) -> CompletionPolicy {
        CompletionPolicy::from_flag(self.allow_batch_recompletion)
    }
}

fn decimal_epsilon(value: f64) -> Result<Decimal, rust_decimal::Error> {
    Decimal::try_from(value).map(|d| d.round_dp(6))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            consistency_epsilon: 0.01,
            allow_batch_recompletion: false,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("CRP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("engine.consistency_epsilon", 0.01)?
            .set_default("engine.allow_batch_recompletion", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CRP_ prefix)
            .add_source(
                Environment::with_prefix("CRP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.engine.validate()?;
        Ok(config)
    }
}
