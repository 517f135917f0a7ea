//! Root configuration types.

use super::cache::CacheConfig;
use super::database::DatabaseConfig;
use super::defaults::default_port;
use super::logging::LoggingConfig;
use super::metrics::MetricsConfig;
use super::registry::RegistryConfig;
use super::security::SecurityConfig;
use super::server::ServerConfig;
use super::session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Root configuration struct for the role server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            registry: RegistryConfig::default(),
            metrics: MetricsConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}
