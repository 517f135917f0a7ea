//! Periodic host resource sampler (`SPEC_FULL.md` §4.2).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use sysinfo::{Pid, System};
use tokio::task::JoinHandle;

/// Point-in-time host/process snapshot. Shared through an `ArcSwap` so the
/// hot read path (`Metrics::get_stats`) never contends with the sampling
/// task, matching the read-mostly-shared-state idiom used by
/// `examples/GeosiaGame-Geosia` for similar periodically-refreshed state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSnapshot {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_bytes: u64,
}

/// Samples process CPU/memory on a fixed interval and exposes a gauge for
/// the caller-maintained "concurrency unit" count (e.g. active task count).
pub struct SystemCollector {
    snapshot: Arc<ArcSwap<SystemSnapshot>>,
    task_count: Arc<AtomicU64>,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl SystemCollector {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            snapshot: Arc::new(ArcSwap::from_pointee(SystemSnapshot::default())),
            task_count: Arc::new(AtomicU64::new(0)),
            handle: std::sync::Mutex::new(None),
            interval,
        }
    }

    /// Spawns the sampling loop. Idempotent: calling `start` twice replaces
    /// the previous task.
    pub fn start(self: &Arc<Self>) {
        let collector = Arc::clone(self);
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = guard.take() {
            old.abort();
        }
        let task = tokio::spawn(async move {
            let pid = Pid::from_u32(std::process::id());
            let mut system = System::new();
            let mut ticker = tokio::time::interval(collector.interval);
            loop {
                ticker.tick().await;
                system.refresh_process(pid);
                system.refresh_memory();

                let (cpu_percent, memory_bytes) = system
                    .process(pid)
                    .map_or((0.0, 0), |p| (p.cpu_usage(), p.memory()));

                let total_mem = system.total_memory().max(1);
                let memory_percent = (memory_bytes as f64 / total_mem as f64 * 100.0) as f32;

                collector.snapshot.store(Arc::new(SystemSnapshot {
                    cpu_percent,
                    memory_percent,
                    memory_bytes,
                }));
            }
        });
        *guard = Some(task);
    }

    pub fn stop(&self) {
        if let Some(task) = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SystemSnapshot {
        **self.snapshot.load()
    }

    /// Caller-maintained gauge for the "concurrency unit" count (e.g. the
    /// number of in-flight message handlers), surfaced alongside host stats.
    pub fn set_task_count(&self, count: u64) {
        self.task_count.store(count, Ordering::Relaxed);
    }

    #[must_use]
    pub fn task_count(&self) -> u64 {
        self.task_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_with_zero_snapshot() {
        let collector = SystemCollector::new(Duration::from_millis(20));
        assert_eq!(collector.snapshot().cpu_percent, 0.0);
    }

    #[tokio::test]
    async fn sampling_loop_populates_snapshot() {
        let collector = Arc::new(SystemCollector::new(Duration::from_millis(10)));
        collector.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        collector.stop();

        // memory_bytes should be nonzero for a live process on a real host.
        assert!(collector.snapshot().memory_bytes > 0);
    }

    #[test]
    fn task_count_round_trips() {
        let collector = SystemCollector::new(Duration::from_secs(5));
        collector.set_task_count(42);
        assert_eq!(collector.task_count(), 42);
    }
}
