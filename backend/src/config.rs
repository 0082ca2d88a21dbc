//! Configuration management for the Business Marketplace
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with MARKETPLACE__ prefix (e.g. `MARKETPLACE__SERVER__PORT`)

use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

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

    /// Simulated payment provider
    pub payments: PaymentsConfig,

    /// Email verification codes
    pub verification: VerificationConfig,

    /// Log output
    pub logging: LoggingConfig,
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

    /// Apply pending migrations at startup
    pub run_migrations: bool,

    /// Insert the sample catalog when the businesses table is empty
    pub seed_sample_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    /// Probability in [0, 1] that a simulated charge succeeds
    pub success_rate: f64,

    pub listing_fee: Decimal,

    pub subscription_price: Decimal,

    /// Length of one paid subscription period
    pub subscription_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    pub code_ttl_minutes: i64,

    /// Wrong guesses allowed before a code is burned
    pub max_attempts: i32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,

    pub format: LogFormat,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("MARKETPLACE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self::defaults(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (MARKETPLACE__SECTION__KEY)
            .add_source(
                Environment::with_prefix("MARKETPLACE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Builder pre-populated with every default value
    pub fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", true)?
            .set_default("database.seed_sample_data", environment == "development")?
            .set_default("jwt.access_token_expiry", 86400)?
            .set_default("payments.success_rate", 0.9)?
            .set_default("payments.listing_fee", "99.00")?
            .set_default("payments.subscription_price", "29.00")?
            .set_default("payments.subscription_days", 30)?
            .set_default("verification.code_ttl_minutes", 15)?
            .set_default("verification.max_attempts", 5)?
            .set_default(
                "logging.filter",
                "marketplace_server=debug,marketplace_backend=debug,tower_http=debug,sqlx=warn",
            )?
            .set_default("logging.format", "pretty")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 16 {
            return Err(ConfigError::Message(
                "jwt.secret must be at least 16 characters".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.payments.success_rate) {
            return Err(ConfigError::Message(format!(
                "payments.success_rate must be between 0 and 1, got {}",
                self.payments.success_rate
            )));
        }
        if self.payments.listing_fee <= Decimal::ZERO
            || self.payments.subscription_price <= Decimal::ZERO
        {
            return Err(ConfigError::Message("payment amounts must be positive".into()));
        }
        if self.payments.subscription_days <= 0 || self.verification.code_ttl_minutes <= 0 {
            return Err(ConfigError::Message(
                "subscription_days and code_ttl_minutes must be positive".into(),
            ));
        }
        Ok(())
    }
}
