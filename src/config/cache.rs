//! Key-value cache configuration.

use super::defaults::{
    default_online_marker_ttl_secs, default_role_cache_ttl_secs, default_session_cache_ttl_secs,
};
use serde::{Deserialize, Serialize};

/// Per-namespace default TTLs for the `CacheDAO` facade (`SPEC_FULL.md` §4.6).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_role_cache_ttl_secs")]
    pub role_ttl_secs: u64,
    #[serde(default = "default_session_cache_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_online_marker_ttl_secs")]
    pub online_marker_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            role_ttl_secs: default_role_cache_ttl_secs(),
            session_ttl_secs: default_session_cache_ttl_secs(),
            online_marker_ttl_secs: default_online_marker_ttl_secs(),
        }
    }
}
