//! Transport (HTTP listener) configuration.

use super::defaults::{default_cors_origins, default_port, default_shutdown_timeout_secs};
use serde::{Deserialize, Serialize};

/// Bind address and lifecycle timing for the forwarded-message listener.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// TCP port the `ForwardMessage` HTTP adapter listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (comma-separated, or "*" for any).
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Maximum time to wait for in-flight servers to stop during shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: default_cors_origins(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}
