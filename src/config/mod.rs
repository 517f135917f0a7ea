//! Configuration module for the role server.
//!
//! This module provides layered configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`cache`]: CacheDAO namespace TTLs
//! - [`database`]: Relational store backend selection
//! - [`registry`]: Service registry publisher settings
//! - [`metrics`]: Sliding-window, system-collector, and reporter settings
//! - [`session`]: Session grace-timer settings
//! - [`server`]: Transport listener settings
//! - [`security`]: TLS settings (`tls` feature)
//! - [`logging`]: Logging configuration
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

// Submodules
pub mod cache;
pub mod database;
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod security;
pub mod server;
pub mod session;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use cache::CacheConfig;

pub use database::DatabaseConfig;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use metrics::MetricsConfig;

pub use registry::RegistryConfig;

pub use security::{SecurityConfig, TlsServerConfig};

pub use server::ServerConfig;

pub use session::SessionConfig;

pub use types::Config;

pub use validation::{is_production_mode, validate_config_security};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 7536);
        assert_eq!(config.cache.role_ttl_secs, 1800);
        assert_eq!(config.cache.session_ttl_secs, 3600);
        assert_eq!(config.cache.online_marker_ttl_secs, 60);
        assert_eq!(config.registry.lease_ttl_secs, 15);
        assert_eq!(config.metrics.sliding_window_secs, 60);
        assert_eq!(config.metrics.sliding_window_buckets, 12);
        assert_eq!(config.session.disconnect_grace_secs, 60);
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
        assert_eq!(
            config.registry.service_name,
            deserialized.registry.service_name
        );
        assert_eq!(
            config.metrics.sliding_window_secs,
            deserialized.metrics.sliding_window_secs
        );
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }
}
