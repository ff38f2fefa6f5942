//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LAUNDRY_NOTIFY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use laundry_notify::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Subscribing to {}", config.mqtt.topic);
//! ```

mod database;
mod error;
mod mqtt;
mod ntfy;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use mqtt::MqttConfig;
pub use ntfy::NtfySection;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// MQTT broker the hub publishes on
    pub mqtt: MqttConfig,

    /// ntfy push notifications
    pub ntfy: NtfySection,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LAUNDRY_NOTIFY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `LAUNDRY_NOTIFY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `LAUNDRY_NOTIFY__MQTT__TOPIC=home/laundry/+` -> `mqtt.topic = home/laundry/+`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LAUNDRY_NOTIFY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.mqtt.validate()?;
        self.ntfy.validate(&self.server.environment)?;
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

    const VARS: &[&str] = &[
        "LAUNDRY_NOTIFY__DATABASE__URL",
        "LAUNDRY_NOTIFY__MQTT__HOST",
        "LAUNDRY_NOTIFY__MQTT__CLIENT_ID",
        "LAUNDRY_NOTIFY__MQTT__TOPIC",
        "LAUNDRY_NOTIFY__NTFY__BASE_TOPIC",
        "LAUNDRY_NOTIFY__NTFY__DRY_RUN",
        "LAUNDRY_NOTIFY__SERVER__PORT",
        "LAUNDRY_NOTIFY__SERVER__ENVIRONMENT",
    ];

    fn set_minimal_env() {
        env::set_var("LAUNDRY_NOTIFY__DATABASE__URL", "postgresql://test@localhost/laundry");
        env::set_var("LAUNDRY_NOTIFY__MQTT__HOST", "broker.local");
        env::set_var("LAUNDRY_NOTIFY__MQTT__CLIENT_ID", "laundry-notify");
        env::set_var("LAUNDRY_NOTIFY__MQTT__TOPIC", "home/laundry/+");
        env::set_var("LAUNDRY_NOTIFY__NTFY__BASE_TOPIC", "laundry");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/laundry");
        assert_eq!(config.mqtt.topic, "home/laundry/+");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.ntfy.base_topic, "laundry");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_mqtt_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("LAUNDRY_NOTIFY__MQTT__HOST");
        env::remove_var("LAUNDRY_NOTIFY__MQTT__CLIENT_ID");
        env::remove_var("LAUNDRY_NOTIFY__MQTT__TOPIC");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_server_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("LAUNDRY_NOTIFY__SERVER__PORT", "3000");
        env::set_var("LAUNDRY_NOTIFY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
    }

    #[test]
    fn test_dry_run_flag() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("LAUNDRY_NOTIFY__NTFY__DRY_RUN", "true");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().ntfy.dry_run);
    }
}
