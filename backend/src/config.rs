//! Configuration management for the Juice Production Planning service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with JPP_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::MaterialRatio;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// JWT validation configuration
    pub jwt: JwtConfig,

    /// Quality test image storage
    pub storage: StorageConfig,

    /// Planning and execution tuning
    pub production: ProductionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
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
    /// Secret key the issuer signs tokens with
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Endpoint accepting multipart image uploads
    pub upload_endpoint: String,

    /// Base URL stored images are served from
    pub public_base_url: String,

    pub api_key: String,

    /// Largest accepted image in bytes
    pub max_image_bytes: usize,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProductionConfig {
    /// Attempts at a fresh suffix when a batch code collides on insert
    pub batch_code_max_attempts: u32,

    /// Ratio used for materials without production history (kg/L)
    pub default_ratio_avg: Decimal,
    pub default_ratio_min: Decimal,
    pub default_ratio_max: Decimal,

    pub currency: String,
}

impl ProductionConfig {
    pub fn default_ratio(&self) -> MaterialRatio {
        MaterialRatio {
            min: self.default_ratio_min,
            max: self.default_ratio_max,
            avg: self.default_ratio_avg,
            sample_count: 0,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("JPP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.upload_endpoint", "http://localhost:9000/upload")?
            .set_default("storage.public_base_url", "http://localhost:9000/media")?
            .set_default("storage.api_key", "")?
            .set_default("storage.max_image_bytes", 5 * 1024 * 1024)?
            .set_default("storage.timeout_secs", 30)?
            .set_default("production.batch_code_max_attempts", 5)?
            .set_default("production.default_ratio_avg", "2.0")?
            .set_default("production.default_ratio_min", "1.8")?
            .set_default("production.default_ratio_max", "2.2")?
            .set_default("production.currency", "THB")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (JPP_ prefix)
            .add_source(
                Environment::with_prefix("JPP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ProductionConfig {
    fn default() -> Self {
        let ratio = MaterialRatio::conservative_default();
        Self {
            batch_code_max_attempts: 5,
            default_ratio_avg: ratio.avg,
            default_ratio_min: ratio.min,
            default_ratio_max: ratio.max,
            currency: "THB".to_string(),
        }
    }
}
