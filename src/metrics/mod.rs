//! `Metrics`: counters/histograms plus the composed `Stats` snapshot
//! (`SPEC_FULL.md` §4.3).

pub mod sliding_window;
pub mod system_collector;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;
use tokio::sync::Mutex;

use sliding_window::SlidingWindow;
use system_collector::SystemCollector;

use crate::config::MetricsConfig;

/// Counter keyed by a small label set, following the teacher's
/// `AtomicU64`-per-series approach (`metrics.rs`) rather than pulling in a
/// full Prometheus client.
#[derive(Default)]
struct LabeledCounters {
    values: std::sync::RwLock<HashMap<String, AtomicU64>>,
}

impl LabeledCounters {
    fn increment(&self, label: &str) {
        if let Some(counter) = self.values.read().unwrap_or_else(|e| e.into_inner()).get(label) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let mut map = self.values.write().unwrap_or_else(|e| e.into_inner());
        map.entry(label.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> HashMap<String, u64> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Aggregate snapshot returned by [`Metrics::get_stats`] (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub messages_total: u64,
    pub messages_success: u64,
    pub messages_failed: u64,
    pub online_roles: u64,
    pub qps: f64,
    pub avg_latency_secs: f64,
    pub min_latency_secs: f64,
    pub max_latency_secs: f64,
    pub success_rate: f64,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_bytes: u64,
    pub task_count: u64,
}

/// Namespace-scoped counters/histograms plus the embedded `SlidingWindow`
/// and `SystemCollector`.
pub struct Metrics {
    namespace: String,
    messages_total: AtomicU64,
    messages_success: AtomicU64,
    messages_failed: AtomicU64,
    online_roles: AtomicU64,
    login_success: AtomicU64,
    login_failure: AtomicU64,
    message_by_opcode: LabeledCounters,
    db_ops: LabeledCounters,
    cache_hits: LabeledCounters,
    cache_misses: LabeledCounters,
    message_duration: Mutex<Histogram<u64>>,
    db_duration: Mutex<Histogram<u64>>,
    sliding_window: SlidingWindow,
    system_collector: Arc<SystemCollector>,
}

impl Metrics {
    #[must_use]
    pub fn new(config: &MetricsConfig) -> Self {
        // Track microsecond-resolution latencies up to ~1 minute with 3
        // significant digits, falling back to a coarser histogram if the
        // preferred precision can't be allocated (mirrors `metrics.rs`'s
        // graceful multi-stage fallback on histogram creation failure).
        let message_duration = Histogram::new_with_bounds(1, 60_000_000, 3)
            .or_else(|_| Histogram::new_with_bounds(1, 60_000_000, 1))
            .unwrap_or_else(|_| {
                Histogram::new(1).expect("a 0-significant-digit histogram always constructs")
            });
        let db_duration = Histogram::new_with_bounds(1, 60_000_000, 3)
            .or_else(|_| Histogram::new_with_bounds(1, 60_000_000, 1))
            .unwrap_or_else(|_| {
                Histogram::new(1).expect("a 0-significant-digit histogram always constructs")
            });

        Self {
            namespace: config.namespace.clone(),
            messages_total: AtomicU64::new(0),
            messages_success: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            online_roles: AtomicU64::new(0),
            login_success: AtomicU64::new(0),
            login_failure: AtomicU64::new(0),
            message_by_opcode: LabeledCounters::default(),
            db_ops: LabeledCounters::default(),
            cache_hits: LabeledCounters::default(),
            cache_misses: LabeledCounters::default(),
            message_duration: Mutex::new(message_duration),
            db_duration: Mutex::new(db_duration),
            sliding_window: SlidingWindow::new(
                Duration::from_secs(config.sliding_window_secs),
                config.sliding_window_buckets,
            ),
            system_collector: Arc::new(SystemCollector::new(Duration::from_secs(
                config.system_collect_interval_secs,
            ))),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn start(self: &Arc<Self>) {
        self.system_collector.start();
    }

    pub fn stop(&self) {
        self.system_collector.stop();
    }

    /// Records a dispatched message's outcome: a labeled counter per
    /// `(op_code, result)`, the duration histogram, and the sliding window.
    pub async fn record_message(&self, op_code: u32, ok: bool, duration: Duration) {
        self.messages_total.fetch_add(1, Ordering::Relaxed);
        if ok {
            self.messages_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.messages_failed.fetch_add(1, Ordering::Relaxed);
        }

        let result = if ok { "ok" } else { "err" };
        self.message_by_opcode.increment(&format!("{op_code}:{result}"));

        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX).max(1);
        if let Ok(mut hist) = self.message_duration.try_lock() {
            let _ = hist.record(micros);
        }

        self.sliding_window.record(duration, ok);
    }

    pub fn record_role_online(&self, ok: bool) {
        if ok {
            self.login_success.fetch_add(1, Ordering::Relaxed);
            self.online_roles.fetch_add(1, Ordering::Relaxed);
        } else {
            self.login_failure.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_role_offline(&self) {
        let _ = self
            .online_roles
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub fn set_online_roles(&self, count: u64) {
        self.online_roles.store(count, Ordering::Relaxed);
    }

    pub async fn record_db_query(&self, operation: &str, ok: bool, duration: Duration) {
        let result = if ok { "ok" } else { "err" };
        self.db_ops.increment(&format!("{operation}:{result}"));
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX).max(1);
        if let Ok(mut hist) = self.db_duration.try_lock() {
            let _ = hist.record(micros);
        }
    }

    pub fn record_cache_hit(&self, cache_type: &str) {
        self.cache_hits.increment(cache_type);
    }

    pub fn record_cache_miss(&self, cache_type: &str) {
        self.cache_misses.increment(cache_type);
    }

    pub fn set_task_count(&self, count: u64) {
        self.system_collector.set_task_count(count);
    }

    #[must_use]
    pub fn get_stats(&self) -> Stats {
        let window = self.sliding_window.stats();
        let system = self.system_collector.snapshot();

        Stats {
            messages_total: self.messages_total.load(Ordering::Relaxed),
            messages_success: self.messages_success.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            online_roles: self.online_roles.load(Ordering::Relaxed),
            qps: window.qps,
            avg_latency_secs: window.avg_latency_secs,
            min_latency_secs: window.min_latency_secs,
            max_latency_secs: window.max_latency_secs,
            success_rate: window.success_rate,
            cpu_percent: system.cpu_percent,
            memory_percent: system.memory_percent,
            memory_bytes: system.memory_bytes,
            task_count: self.system_collector.task_count(),
        }
    }
}
