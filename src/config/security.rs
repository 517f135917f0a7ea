//! Transport-level (TLS) security configuration.
//!
//! Only exercised when the `tls` feature is enabled; plain HTTP is the
//! default, matching the teacher's posture of running behind a reverse
//! proxy by default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub tls: TlsServerConfig,
}

/// TLS server configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TlsServerConfig {
    /// Enable HTTPS/TLS termination for the forwarded-message listener.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the PEM-encoded certificate chain presented to clients.
    #[serde(default)]
    pub certificate_path: Option<String>,
    /// Path to the PEM-encoded private key corresponding to the certificate chain.
    #[serde(default)]
    pub private_key_path: Option<String>,
}
