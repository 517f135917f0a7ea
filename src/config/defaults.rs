//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's `#[serde(default = ...)]`
//! attributes throughout the configuration system. Functions are organized by category for
//! easier maintenance.

use super::logging::LogFormat;

// =============================================================================
// Transport
// =============================================================================

pub const fn default_port() -> u16 {
    7536
}

pub const fn default_shutdown_timeout_secs() -> u64 {
    10
}

// =============================================================================
// Database / Cache
// =============================================================================

pub const fn default_role_cache_ttl_secs() -> u64 {
    1800 // 30 minutes, per SPEC_FULL.md §4.6
}

pub const fn default_session_cache_ttl_secs() -> u64 {
    3600 // 1 hour
}

pub const fn default_online_marker_ttl_secs() -> u64 {
    60
}

// =============================================================================
// Registry
// =============================================================================

pub fn default_registry_service_name() -> String {
    "game".to_string()
}

pub fn default_registry_prefix() -> String {
    "/services".to_string()
}

pub const fn default_registry_lease_ttl_secs() -> u64 {
    15
}

pub const fn default_registry_keep_alive_interval_secs() -> u64 {
    5
}

pub const fn default_registry_enabled() -> bool {
    true
}

// =============================================================================
// Metrics
// =============================================================================

pub fn default_metrics_namespace() -> String {
    "role_server".to_string()
}

pub const fn default_sliding_window_secs() -> u64 {
    60
}

pub const fn default_sliding_window_buckets() -> usize {
    12
}

pub const fn default_system_collect_interval_secs() -> u64 {
    5
}

// =============================================================================
// Reporter
// =============================================================================

pub const fn default_reporter_enabled() -> bool {
    true
}

pub const fn default_reporter_interval_secs() -> u64 {
    10
}

pub const fn default_reporter_timeout_secs() -> u64 {
    5
}

// =============================================================================
// Session
// =============================================================================

pub const fn default_disconnect_grace_secs() -> u64 {
    60
}

// =============================================================================
// Balancer
// =============================================================================

pub const fn default_consistent_hash_replicas() -> usize {
    150
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security (TLS, `tls` feature only)
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}
