//! Metrics, sliding-window, and reporter configuration.

use super::defaults::{
    default_metrics_namespace, default_reporter_enabled, default_reporter_interval_secs,
    default_reporter_timeout_secs, default_sliding_window_buckets, default_sliding_window_secs,
    default_system_collect_interval_secs,
};
use serde::{Deserialize, Serialize};

/// Configuration for `Metrics`, its embedded `SlidingWindow`/`SystemCollector`,
/// and the periodic `Reporter` that publishes snapshots to the registry.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetricsConfig {
    /// Prefix applied to all counter/histogram names.
    #[serde(default = "default_metrics_namespace")]
    pub namespace: String,
    /// Width of the rolling QPS/latency window, in seconds.
    #[serde(default = "default_sliding_window_secs")]
    pub sliding_window_secs: u64,
    /// Number of buckets the sliding window is divided into.
    #[serde(default = "default_sliding_window_buckets")]
    pub sliding_window_buckets: usize,
    /// Interval between host CPU/memory samples.
    #[serde(default = "default_system_collect_interval_secs")]
    pub system_collect_interval_secs: u64,
    /// Whether the periodic Metrics -> Registry reporter loop runs.
    #[serde(default = "default_reporter_enabled")]
    pub reporter_enabled: bool,
    /// Interval between reporter ticks.
    #[serde(default = "default_reporter_interval_secs")]
    pub reporter_interval_secs: u64,
    /// Per-tick timeout applied to the registry metadata update call.
    #[serde(default = "default_reporter_timeout_secs")]
    pub reporter_timeout_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_metrics_namespace(),
            sliding_window_secs: default_sliding_window_secs(),
            sliding_window_buckets: default_sliding_window_buckets(),
            system_collect_interval_secs: default_system_collect_interval_secs(),
            reporter_enabled: default_reporter_enabled(),
            reporter_interval_secs: default_reporter_interval_secs(),
            reporter_timeout_secs: default_reporter_timeout_secs(),
        }
    }
}
