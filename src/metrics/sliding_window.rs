//! Bucketed atomic latency/success aggregator (`SPEC_FULL.md` §4.1).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// One bucket's accumulated samples, covering `window / bucket_count` of
/// wall-clock time. `start_millis` identifies which real-time slot the
/// bucket currently represents; a write that lands on a stale slot resets
/// it first, giving the lazy-reset behavior `SPEC_FULL.md` §4.1 calls for
/// instead of a background sweep.
struct Bucket {
    slot: AtomicU64,
    count: AtomicU64,
    failures: AtomicU64,
    latency_sum_nanos: AtomicU64,
    latency_min_nanos: AtomicU64,
    latency_max_nanos: AtomicU64,
    initialized: AtomicBool,
}

impl Bucket {
    fn new() -> Self {
        Self {
            slot: AtomicU64::new(0),
            count: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            latency_sum_nanos: AtomicU64::new(0),
            latency_min_nanos: AtomicU64::new(u64::MAX),
            latency_max_nanos: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    fn reset(&self, slot: u64) {
        self.slot.store(slot, Ordering::SeqCst);
        self.count.store(0, Ordering::SeqCst);
        self.failures.store(0, Ordering::SeqCst);
        self.latency_sum_nanos.store(0, Ordering::SeqCst);
        self.latency_min_nanos.store(u64::MAX, Ordering::SeqCst);
        self.latency_max_nanos.store(0, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
    }

    fn record(&self, slot: u64, latency: Duration, ok: bool) {
        if self.slot.load(Ordering::SeqCst) != slot || !self.initialized.load(Ordering::SeqCst) {
            self.reset(slot);
        }

        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.latency_min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.latency_max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    fn snapshot(&self, current_slot: u64, bucket_count: u64) -> Option<BucketSnapshot> {
        let slot = self.slot.load(Ordering::SeqCst);
        if !self.initialized.load(Ordering::SeqCst) {
            return None;
        }
        // A bucket is live if its slot is within the last `bucket_count` slots.
        if current_slot.saturating_sub(slot) >= bucket_count {
            return None;
        }
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        Some(BucketSnapshot {
            count,
            failures: self.failures.load(Ordering::Relaxed),
            latency_sum_nanos: self.latency_sum_nanos.load(Ordering::Relaxed),
            latency_min_nanos: self.latency_min_nanos.load(Ordering::Relaxed),
            latency_max_nanos: self.latency_max_nanos.load(Ordering::Relaxed),
        })
    }
}

struct BucketSnapshot {
    count: u64,
    failures: u64,
    latency_sum_nanos: u64,
    latency_min_nanos: u64,
    latency_max_nanos: u64,
}

/// Aggregated view produced by [`SlidingWindow::stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub qps: f64,
    pub avg_latency_secs: f64,
    pub min_latency_secs: f64,
    pub max_latency_secs: f64,
    pub success_rate: f64,
}

impl Default for WindowStats {
    fn default() -> Self {
        Self {
            qps: 0.0,
            avg_latency_secs: 0.0,
            min_latency_secs: 0.0,
            max_latency_secs: 0.0,
            success_rate: 1.0,
        }
    }
}

/// Time-bucketed rolling aggregator. `record` and `stats` are lock-free;
/// each bucket uses only atomics, matching the teacher's preference for
/// atomic counters over a mutex on the hot message path (`metrics.rs`).
pub struct SlidingWindow {
    buckets: Vec<Bucket>,
    bucket_width: Duration,
    window: Duration,
    start: Instant,
}

impl SlidingWindow {
    #[must_use]
    pub fn new(window: Duration, bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        let bucket_width = window / u32::try_from(bucket_count).unwrap_or(1).max(1);
        Self {
            buckets: (0..bucket_count).map(|_| Bucket::new()).collect(),
            bucket_width,
            window,
            start: Instant::now(),
        }
    }

    fn current_slot(&self) -> u64 {
        let elapsed = self.start.elapsed();
        u64::try_from(elapsed.as_nanos() / self.bucket_width.as_nanos().max(1)).unwrap_or(0)
    }

    fn bucket_index(&self, slot: u64) -> usize {
        (slot as usize) % self.buckets.len()
    }

    pub fn record(&self, latency: Duration, ok: bool) {
        let slot = self.current_slot();
        let idx = self.bucket_index(slot);
        self.buckets[idx].record(slot, latency, ok);
    }

    #[must_use]
    pub fn stats(&self) -> WindowStats {
        let current_slot = self.current_slot();
        let bucket_count = self.buckets.len() as u64;

        let mut total_count = 0u64;
        let mut total_failures = 0u64;
        let mut total_latency_nanos = 0u64;
        let mut min_nanos = u64::MAX;
        let mut max_nanos = 0u64;

        for bucket in &self.buckets {
            if let Some(snap) = bucket.snapshot(current_slot, bucket_count) {
                total_count += snap.count;
                total_failures += snap.failures;
                total_latency_nanos += snap.latency_sum_nanos;
                min_nanos = min_nanos.min(snap.latency_min_nanos);
                max_nanos = max_nanos.max(snap.latency_max_nanos);
            }
        }

        if total_count == 0 {
            return WindowStats::default();
        }

        let window_secs = self.window.as_secs_f64().max(f64::EPSILON);
        WindowStats {
            qps: total_count as f64 / window_secs,
            avg_latency_secs: (total_latency_nanos as f64 / total_count as f64) / 1e9,
            min_latency_secs: min_nanos as f64 / 1e9,
            max_latency_secs: max_nanos as f64 / 1e9,
            success_rate: (total_count - total_failures) as f64 / total_count as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_zero_stats_and_full_success_rate() {
        let window = SlidingWindow::new(Duration::from_secs(10), 5);
        let stats = window.stats();
        assert_eq!(stats.qps, 0.0);
        assert_eq!(stats.success_rate, 1.0);
    }

    #[test]
    fn records_feed_into_qps_and_latency() {
        let window = SlidingWindow::new(Duration::from_secs(10), 5);
        for _ in 0..10 {
            window.record(Duration::from_millis(100), true);
        }
        let stats = window.stats();
        assert_eq!(stats.qps, 1.0);
        assert!((stats.avg_latency_secs - 0.1).abs() < 1e-6);
        assert_eq!(stats.success_rate, 1.0);
    }

    #[test]
    fn failures_lower_success_rate() {
        let window = SlidingWindow::new(Duration::from_secs(10), 5);
        for _ in 0..8 {
            window.record(Duration::from_millis(10), true);
        }
        for _ in 0..2 {
            window.record(Duration::from_millis(10), false);
        }
        assert!((window.stats().success_rate - 0.8).abs() < 1e-6);
    }

    #[test]
    fn min_and_max_latency_track_extremes() {
        let window = SlidingWindow::new(Duration::from_secs(10), 1);
        window.record(Duration::from_millis(5), true);
        window.record(Duration::from_millis(50), true);
        let stats = window.stats();
        assert!((stats.min_latency_secs - 0.005).abs() < 1e-6);
        assert!((stats.max_latency_secs - 0.050).abs() < 1e-6);
    }
}
