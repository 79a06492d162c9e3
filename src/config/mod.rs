//! Configuration module.
//!
//! Supports JSON configuration files, environment variable overrides, and
//! sensible compiled-in defaults.
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`server`]: Session lifecycle and sweep cadence settings
//! - [`protocol`]: Input validation limits
//! - [`security`]: CORS, message size, and per-IP connection settings
//! - [`logging`]: Logging configuration
//! - [`loader`]: Configuration loading functions
//! - [`validation`]: Startup sanity checks
//! - [`defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use protocol::ProtocolConfig;
pub use security::SecurityConfig;
pub use server::{RateLimitConfig, ServerConfig};
pub use types::Config;
pub use validation::validate_config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3545);
        assert_eq!(config.server.idle_timeout, 600);
        assert_eq!(config.server.search_timeout, 180);
        assert_eq!(config.server.cleanup_interval, 60);
        assert_eq!(config.server.matching_interval_ms, 2000);

        assert_eq!(config.rate_limit.max_records, 10_000);

        assert_eq!(config.protocol.min_username_length, 2);
        assert_eq!(config.protocol.max_username_length, 20);
        assert_eq!(config.protocol.max_interests, 5);
        assert!(config
            .protocol
            .restricted_words
            .contains(&"admin".to_string()));

        assert_eq!(config.security.cors_origins, "*");
        assert_eq!(config.security.max_message_size, 65536);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(config.server.idle_timeout, deserialized.server.idle_timeout);
        assert_eq!(
            config.protocol.max_username_length,
            deserialized.protocol.max_username_length
        );
        assert_eq!(
            config.rate_limit.max_records,
            deserialized.rate_limit.max_records
        );
    }

    #[test]
    fn test_log_level_round_trip() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(
            serde_json::from_str::<LogLevel>("\"warn\"").unwrap(),
            LogLevel::Warn
        );
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"port": 9999}"#).unwrap();
        assert_eq!(cfg.port, 9999);
        assert_eq!(cfg.server.idle_timeout, 600);
        assert_eq!(cfg.security.max_connections_per_ip, 10);
    }
}
