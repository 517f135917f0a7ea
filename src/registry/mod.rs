//! Leased service registry: publish this instance's `ServiceInfo` and
//! resolve the live set for a service name (`SPEC_FULL.md` §4.4).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

/// One instance's published address and load metadata. `metadata` carries a
/// fixed key set (`SPEC_FULL.md` §6): `qps`, `cpu_percent`, `online_roles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    pub service_name: String,
    pub instance_id: Uuid,
    pub addr: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct ServiceEntry {
    info: ServiceInfo,
    expires_at: DateTime<Utc>,
}

/// Opaque handle returned by [`Registrar::register`], presented back on
/// keep-alive/deregister calls.
#[derive(Debug, Clone)]
pub struct LeaseHandle {
    service_name: String,
    instance_id: Uuid,
}

/// Publishing side: register a leased entry, keep it alive, update its
/// metadata, and deregister it on shutdown.
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(&self, info: ServiceInfo, ttl: Duration) -> Result<LeaseHandle>;
    async fn keep_alive(&self, handle: &LeaseHandle, ttl: Duration) -> Result<bool>;
    async fn update_metadata(
        &self,
        handle: &LeaseHandle,
        metadata: HashMap<String, String>,
    ) -> Result<bool>;
    async fn deregister(&self, handle: &LeaseHandle) -> Result<()>;
}

/// Resolving side: read the currently-live set for a service name and watch
/// for subsequent changes.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, service_name: &str) -> Vec<ServiceInfo>;

    /// A `watch` receiver that yields the full live set on every change.
    /// Mirrors the "initial list + change stream" shape rather than a
    /// diff stream, matching the teacher's preference for broadcasting
    /// whole snapshots over deltas (`broadcast.rs`).
    fn watch(&self, service_name: &str) -> watch::Receiver<Vec<ServiceInfo>>;
}

/// Single-process registry backed by a leased key/value map, grounded on
/// `distributed.rs`'s `InMemoryDistributedLock`: one write-lock acquisition
/// does the stale-entry sweep and the insert/update together so there is no
/// TOCTOU gap between "is this slot free" and "claim it".
pub struct InMemoryRegistry {
    entries: RwLock<HashMap<(String, Uuid), ServiceEntry>>,
    watchers: RwLock<HashMap<String, watch::Sender<Vec<ServiceInfo>>>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            watchers: RwLock::new(HashMap::new()),
        }
    }

    async fn live_snapshot(
        entries: &HashMap<(String, Uuid), ServiceEntry>,
        service_name: &str,
        now: DateTime<Utc>,
    ) -> Vec<ServiceInfo> {
        entries
            .values()
            .filter(|e| e.info.service_name == service_name && e.expires_at > now)
            .map(|e| e.info.clone())
            .collect()
    }

    async fn notify(&self, service_name: &str) {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let snapshot = Self::live_snapshot(&entries, service_name, now).await;
        drop(entries);

        let watchers = self.watchers.read().await;
        if let Some(tx) = watchers.get(service_name) {
            let _ = tx.send(snapshot);
        }
    }

    async fn sender_for(&self, service_name: &str) -> watch::Sender<Vec<ServiceInfo>> {
        if let Some(tx) = self.watchers.read().await.get(service_name) {
            return tx.clone();
        }
        let mut watchers = self.watchers.write().await;
        watchers
            .entry(service_name.to_string())
            .or_insert_with(|| watch::channel(Vec::new()).0)
            .clone()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registrar for InMemoryRegistry {
    async fn register(&self, info: ServiceInfo, ttl: Duration) -> Result<LeaseHandle> {
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl)?;
        let key = (info.service_name.clone(), info.instance_id);
        let handle = LeaseHandle {
            service_name: info.service_name.clone(),
            instance_id: info.instance_id,
        };

        let mut entries = self.entries.write().await;
        let now = Utc::now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key, ServiceEntry { info, expires_at });
        drop(entries);

        self.sender_for(&handle.service_name).await;
        self.notify(&handle.service_name).await;
        Ok(handle)
    }

    async fn keep_alive(&self, handle: &LeaseHandle, ttl: Duration) -> Result<bool> {
        let new_expiry = Utc::now() + chrono::Duration::from_std(ttl)?;
        let key = (handle.service_name.clone(), handle.instance_id);

        let renewed = {
            let mut entries = self.entries.write().await;
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.expires_at = new_expiry;
                    true
                }
                None => false,
            }
        };
        if renewed {
            self.notify(&handle.service_name).await;
        }
        Ok(renewed)
    }

    async fn update_metadata(
        &self,
        handle: &LeaseHandle,
        metadata: HashMap<String, String>,
    ) -> Result<bool> {
        let key = (handle.service_name.clone(), handle.instance_id);
        let updated = {
            let mut entries = self.entries.write().await;
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.info.metadata = metadata;
                    true
                }
                None => false,
            }
        };
        if updated {
            self.notify(&handle.service_name).await;
        }
        Ok(updated)
    }

    async fn deregister(&self, handle: &LeaseHandle) -> Result<()> {
        let key = (handle.service_name.clone(), handle.instance_id);
        self.entries.write().await.remove(&key);
        self.notify(&handle.service_name).await;
        Ok(())
    }
}

#[async_trait]
impl Resolver for InMemoryRegistry {
    async fn resolve(&self, service_name: &str) -> Vec<ServiceInfo> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Self::live_snapshot(&entries, service_name, now).await
    }

    fn watch(&self, service_name: &str) -> watch::Receiver<Vec<ServiceInfo>> {
        // Best-effort synchronous registration: if no sender exists yet the
        // caller gets a receiver over an empty snapshot that starts ticking
        // once the first `register` call creates the channel via
        // `sender_for`. Callers that need the channel to exist up front
        // should `resolve` first during startup ordering (`app.rs`).
        let watchers = self.watchers.try_read();
        if let Ok(watchers) = watchers {
            if let Some(tx) = watchers.get(service_name) {
                return tx.subscribe();
            }
        }
        let (_tx, rx) = watch::channel(Vec::new());
        rx
    }
}

pub type SharedRegistry = Arc<InMemoryRegistry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn info(service_name: &str, addr: &str) -> ServiceInfo {
        ServiceInfo {
            service_name: service_name.to_string(),
            instance_id: Uuid::new_v4(),
            addr: addr.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn register_then_resolve_finds_entry() {
        let registry = InMemoryRegistry::new();
        registry
            .register(info("game", "127.0.0.1:7536"), Duration::from_secs(10))
            .await
            .unwrap();

        let resolved = registry.resolve("game").await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].addr, "127.0.0.1:7536");
    }

    #[tokio::test]
    async fn expired_lease_is_excluded_from_resolve() {
        let registry = InMemoryRegistry::new();
        registry
            .register(info("game", "127.0.0.1:7536"), Duration::from_millis(1))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(registry.resolve("game").await.is_empty());
    }

    #[tokio::test]
    async fn keep_alive_extends_lease() {
        let registry = InMemoryRegistry::new();
        let handle = registry
            .register(info("game", "127.0.0.1:7536"), Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(registry.keep_alive(&handle, Duration::from_secs(10)).await.unwrap());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.resolve("game").await.len(), 1);
    }

    #[tokio::test]
    async fn deregister_removes_entry_immediately() {
        let registry = InMemoryRegistry::new();
        let handle = registry
            .register(info("game", "127.0.0.1:7536"), Duration::from_secs(10))
            .await
            .unwrap();

        registry.deregister(&handle).await.unwrap();
        assert!(registry.resolve("game").await.is_empty());
    }

    #[tokio::test]
    async fn watch_observes_registration() {
        let registry = InMemoryRegistry::new();
        let mut rx = registry.watch("game");

        registry
            .register(info("game", "127.0.0.1:7536"), Duration::from_secs(10))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }

    #[tokio::test]
    async fn update_metadata_is_reflected_in_resolve() {
        let registry = InMemoryRegistry::new();
        let handle = registry
            .register(info("game", "127.0.0.1:7536"), Duration::from_secs(10))
            .await
            .unwrap();

        let mut meta = HashMap::new();
        meta.insert("qps".to_string(), "12.5".to_string());
        registry.update_metadata(&handle, meta.clone()).await.unwrap();

        let resolved = registry.resolve("game").await;
        assert_eq!(resolved[0].metadata, meta);
    }
}
