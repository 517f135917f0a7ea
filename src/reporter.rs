//! `Reporter`: periodically publishes this instance's load into the
//! registry (`SPEC_FULL.md` §4.13), grounded on `rate_limit.rs`'s
//! `start_cleanup_task(self: Arc<Self>)` background-loop idiom.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::MetricsConfig;
use crate::metrics::Metrics;
use crate::registry::{LeaseHandle, Registrar, ServiceInfo};

/// Owns the keep-alive loop that renews this instance's registry lease and
/// refreshes its advertised load metadata on a fixed interval.
pub struct Reporter<R: Registrar + 'static> {
    registry: Arc<R>,
    metrics: Arc<Metrics>,
    service_info: ServiceInfo,
    lease_ttl: Duration,
    keep_alive_interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<R: Registrar + 'static> Reporter<R> {
    #[must_use]
    pub fn new(
        registry: Arc<R>,
        metrics: Arc<Metrics>,
        service_info: ServiceInfo,
        lease_ttl: Duration,
        keep_alive_interval: Duration,
    ) -> Self {
        Self {
            registry,
            metrics,
            service_info,
            lease_ttl,
            keep_alive_interval,
            handle: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn from_config(
        registry: Arc<R>,
        metrics: Arc<Metrics>,
        service_info: ServiceInfo,
        config: &MetricsConfig,
        lease_ttl: Duration,
    ) -> Self {
        Self::new(
            registry,
            metrics,
            service_info,
            lease_ttl,
            Duration::from_secs(config.reporter_interval_secs),
        )
    }

    /// Registers the service and spawns the keep-alive loop. Idempotent:
    /// a second call replaces the previous loop and re-registers.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        let initial_metadata = load_metadata(&self.metrics);
        let mut info = self.service_info.clone();
        info.metadata = initial_metadata;
        let lease = self.registry.register(info, self.lease_ttl).await?;

        let reporter = Arc::clone(self);
        let task = tokio::spawn(async move {
            reporter.run_loop(lease).await;
        });

        if let Some(old) = self.handle.lock().await.replace(task) {
            old.abort();
        }
        Ok(())
    }

    async fn run_loop(&self, lease: LeaseHandle) {
        let mut ticker = tokio::time::interval(self.keep_alive_interval);
        loop {
            ticker.tick().await;

            if let Err(err) = self.registry.keep_alive(&lease, self.lease_ttl).await {
                tracing::warn!(error = %err, "registry keep-alive failed");
                continue;
            }

            let metadata = load_metadata(&self.metrics);
            if let Err(err) = self.registry.update_metadata(&lease, metadata).await {
                tracing::warn!(error = %err, "registry metadata update failed");
            }
        }
    }

    pub async fn stop(&self) {
        if let Some(task) = self.handle.lock().await.take() {
            task.abort();
        }
    }
}

fn load_metadata(metrics: &Metrics) -> HashMap<String, String> {
    let stats = metrics.get_stats();
    let mut metadata = HashMap::new();
    metadata.insert("qps".to_string(), format!("{:.2}", stats.qps));
    metadata.insert("avg_latency".to_string(), format!("{:.4}", stats.avg_latency_secs));
    metadata.insert("success_rate".to_string(), format!("{:.2}", stats.success_rate));
    metadata.insert("online_roles".to_string(), stats.online_roles.to_string());
    metadata.insert("cpu_percent".to_string(), format!("{:.2}", stats.cpu_percent));
    metadata.insert("memory_percent".to_string(), format!("{:.2}", stats.memory_percent));
    metadata.insert("memory_bytes".to_string(), stats.memory_bytes.to_string());
    metadata.insert("threads".to_string(), stats.task_count.to_string());
    metadata.insert("updated_at".to_string(), chrono::Utc::now().to_rfc3339());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use uuid::Uuid;

    fn service_info() -> ServiceInfo {
        ServiceInfo {
            service_name: "game".to_string(),
            instance_id: Uuid::new_v4(),
            addr: "127.0.0.1:7536".to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn start_registers_with_initial_metadata() {
        let registry = Arc::new(InMemoryRegistry::new());
        let metrics = Arc::new(Metrics::new(&MetricsConfig::default()));
        let reporter = Arc::new(Reporter::new(
            Arc::clone(&registry),
            metrics,
            service_info(),
            Duration::from_secs(10),
            Duration::from_millis(20),
        ));

        reporter.start().await.unwrap();
        let resolved = registry.resolve("game").await;
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].metadata.contains_key("qps"));

        reporter.stop().await;
    }

    #[tokio::test]
    async fn keep_alive_loop_renews_lease_before_it_expires() {
        let registry = Arc::new(InMemoryRegistry::new());
        let metrics = Arc::new(Metrics::new(&MetricsConfig::default()));
        let reporter = Arc::new(Reporter::new(
            Arc::clone(&registry),
            metrics,
            service_info(),
            Duration::from_millis(40),
            Duration::from_millis(10),
        ));

        reporter.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(registry.resolve("game").await.len(), 1);
        reporter.stop().await;
    }
}
