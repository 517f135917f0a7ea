//! Service registry publisher configuration.

use super::defaults::{
    default_registry_enabled, default_registry_keep_alive_interval_secs,
    default_registry_lease_ttl_secs, default_registry_prefix, default_registry_service_name,
};
use serde::{Deserialize, Serialize};

/// Settings for the leased registry entry this instance publishes (`SPEC_FULL.md` §4.4).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistryConfig {
    /// Publish a registry entry and run the Reporter loop at all.
    #[serde(default = "default_registry_enabled")]
    pub enabled: bool,
    /// Logical service name advertised to resolvers.
    #[serde(default = "default_registry_service_name")]
    pub service_name: String,
    /// Key prefix entries are published under.
    #[serde(default = "default_registry_prefix")]
    pub prefix: String,
    /// Network address advertised in the published `ServiceInfo`.
    #[serde(default)]
    pub advertise_addr: Option<String>,
    /// Lease TTL; expiry without a keep-alive removes the entry.
    #[serde(default = "default_registry_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
    /// Interval between keep-alive renewals (should be well under the lease TTL).
    #[serde(default = "default_registry_keep_alive_interval_secs")]
    pub keep_alive_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: default_registry_enabled(),
            service_name: default_registry_service_name(),
            prefix: default_registry_prefix(),
            advertise_addr: None,
            lease_ttl_secs: default_registry_lease_ttl_secs(),
            keep_alive_interval_secs: default_registry_keep_alive_interval_secs(),
        }
    }
}
