//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `PAYLANE` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use paylane::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod cryptomus;
mod error;
mod server;
mod stripe;
mod urls;

pub use cryptomus::CryptomusSettings;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use stripe::StripeSettings;
pub use urls::UrlSettings;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Card rail configuration (Stripe)
    pub stripe: StripeSettings,

    /// Crypto rail configuration (Cryptomus)
    pub cryptomus: CryptomusSettings,

    /// Public URL configuration
    #[serde(default)]
    pub urls: UrlSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `PAYLANE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PAYLANE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYLANE__STRIPE__API_KEY=sk_test_...` -> `stripe.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYLANE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.stripe.validate()?;
        self.cryptomus.validate()?;
        self.urls.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("PAYLANE__STRIPE__API_KEY", "sk_test_xxx");
        env::set_var("PAYLANE__STRIPE__WEBHOOK_SECRET", "whsec_xxx");
        env::set_var("PAYLANE__CRYPTOMUS__API_KEY", "crypto_key");
        env::set_var("PAYLANE__CRYPTOMUS__MERCHANT_ID", "merchant-1");
    }

    fn clear_env() {
        env::remove_var("PAYLANE__STRIPE__API_KEY");
        env::remove_var("PAYLANE__STRIPE__WEBHOOK_SECRET");
        env::remove_var("PAYLANE__CRYPTOMUS__API_KEY");
        env::remove_var("PAYLANE__CRYPTOMUS__MERCHANT_ID");
        env::remove_var("PAYLANE__SERVER__PORT");
        env::remove_var("PAYLANE__SERVER__ENVIRONMENT");
        env::remove_var("PAYLANE__URLS__PUBLIC_BASE_URL");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.stripe.api_key, "sk_test_xxx");
        assert_eq!(config.cryptomus.merchant_id, "merchant-1");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok());
        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.urls.public_base_url, "http://localhost:8080");
    }

    #[test]
    fn test_custom_base_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYLANE__URLS__PUBLIC_BASE_URL", "https://app.example.com");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.urls.public_base_url, "https://app.example.com");
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYLANE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }
}
