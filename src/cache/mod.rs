//! Typed key-value cache facade (`CacheDAO`) and its `KvStore` backend.
//!
//! `CacheDAO` is deliberately backend-agnostic (`SPEC_FULL.md` §9: the three
//! documented deployment modes of a KV store — standalone, replicated,
//! sharded — are indistinguishable through this API). The in-memory
//! implementation here stands in for whichever mode a deployment runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::CacheConfig;
use crate::role::dao::{Role, RoleId};
use crate::session::Session;

/// Minimal byte-oriented KV contract `CacheDAO` is built on.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// In-memory `KvStore`. Expired entries are evicted lazily on the next read
/// that observes them rather than via a background sweep, matching the
/// teacher's preference for lazy cleanup on the read/write path
/// (`InMemoryDistributedLock::try_acquire`) over a dedicated janitor task.
pub struct InMemoryKvStore {
    entries: DashMap<String, (Vec<u8>, Option<Instant>)>,
}

impl InMemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        let (value, expires_at) = entry.value().clone();
        if expires_at.is_some_and(|at| Instant::now() >= at) {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(value))
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Miss,
}

/// Typed facade over `KvStore`, with one fixed key shape and default TTL per
/// namespace (`SPEC_FULL.md` §4.6).
pub struct CacheDAO {
    store: Arc<dyn KvStore>,
    role_ttl: Duration,
    session_ttl: Duration,
    online_marker_ttl: Duration,
}

impl CacheDAO {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            role_ttl: Duration::from_secs(config.role_ttl_secs),
            session_ttl: Duration::from_secs(config.session_ttl_secs),
            online_marker_ttl: Duration::from_secs(config.online_marker_ttl_secs),
        }
    }

    fn role_key(id: RoleId) -> String {
        format!("cache:role:{id}")
    }

    fn session_key(id: RoleId) -> String {
        format!("session:player:{id}")
    }

    fn online_key(id: RoleId) -> String {
        format!("online:player:{id}")
    }

    pub async fn get_role(&self, id: RoleId) -> anyhow::Result<Option<Role>> {
        get_json(self.store.as_ref(), &Self::role_key(id)).await
    }

    pub async fn set_role(&self, role: &Role, ttl: Option<Duration>) -> anyhow::Result<()> {
        set_json(
            self.store.as_ref(),
            &Self::role_key(role.id),
            role,
            ttl.unwrap_or(self.role_ttl),
        )
        .await
    }

    pub async fn delete_role(&self, id: RoleId) -> anyhow::Result<()> {
        self.store.delete(&Self::role_key(id)).await
    }

    pub async fn get_session(&self, id: RoleId) -> anyhow::Result<Option<Session>> {
        get_json(self.store.as_ref(), &Self::session_key(id)).await
    }

    pub async fn set_session(&self, session: &Session, ttl: Option<Duration>) -> anyhow::Result<()> {
        set_json(
            self.store.as_ref(),
            &Self::session_key(session.role_id),
            session,
            ttl.unwrap_or(self.session_ttl),
        )
        .await
    }

    pub async fn delete_session(&self, id: RoleId) -> anyhow::Result<()> {
        self.store.delete(&Self::session_key(id)).await
    }

    pub async fn set_online_marker(&self, id: RoleId) -> anyhow::Result<()> {
        self.store
            .set_with_ttl(&Self::online_key(id), b"1".to_vec(), self.online_marker_ttl)
            .await
    }

    pub async fn is_online_marked(&self, id: RoleId) -> anyhow::Result<bool> {
        Ok(self.store.get(&Self::online_key(id)).await?.is_some())
    }

    pub async fn clear_online_marker(&self, id: RoleId) -> anyhow::Result<()> {
        self.store.delete(&Self::online_key(id)).await
    }
}

async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> anyhow::Result<Option<T>> {
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec(value)?;
    store.set_with_ttl(key, bytes, ttl).await
}

/// Cache hit/miss bookkeeping the caller passes through to `Metrics`; kept
/// out of this module so `CacheDAO` has no dependency on `metrics`.
#[must_use]
pub fn classify_role_lookup(role: &Option<Role>) -> CacheEvent {
    if role.is_some() {
        CacheEvent::Hit
    } else {
        CacheEvent::Miss
    }
}

#[allow(dead_code)]
type AttributesMap = HashMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{RoleSessionState, Session};

    fn dao() -> CacheDAO {
        CacheDAO::new(Arc::new(InMemoryKvStore::new()), &CacheConfig::default())
    }

    #[tokio::test]
    async fn role_round_trips_through_cache() {
        let dao = dao();
        let role = Role::new(1, 100, "alice");
        dao.set_role(&role, None).await.unwrap();

        let fetched = dao.get_role(1).await.unwrap();
        assert_eq!(fetched, Some(role));
    }

    #[tokio::test]
    async fn miss_returns_none_without_error() {
        let dao = dao();
        assert_eq!(dao.get_role(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn role_ttl_expires_entry() {
        let store = Arc::new(InMemoryKvStore::new());
        let dao = CacheDAO::new(
            store.clone(),
            &CacheConfig {
                role_ttl_secs: 0,
                ..CacheConfig::default()
            },
        );
        let role = Role::new(1, 100, "alice");
        // ttl=0 means "use the namespace default", which is itself 0 here,
        // which this store treats as "never expires" — exercise the
        // explicit-ttl override path instead.
        set_json(store.as_ref(), "cache:role:1", &role, Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dao.get_role(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn session_and_online_marker_round_trip() {
        let dao = dao();
        let session = Session {
            role_id: 1,
            session_id: uuid::Uuid::new_v4(),
            gateway_addr: "10.0.0.1:9000".to_string(),
            connected_at: chrono::Utc::now(),
            state: RoleSessionState::Online,
        };
        dao.set_session(&session, None).await.unwrap();
        assert_eq!(dao.get_session(1).await.unwrap().unwrap().role_id, 1);

        assert!(!dao.is_online_marked(1).await.unwrap());
        dao.set_online_marker(1).await.unwrap();
        assert!(dao.is_online_marked(1).await.unwrap());
        dao.clear_online_marker(1).await.unwrap();
        assert!(!dao.is_online_marked(1).await.unwrap());
    }

    #[test]
    fn classify_role_lookup_matches_presence() {
        assert_eq!(classify_role_lookup(&None), CacheEvent::Miss);
        assert_eq!(
            classify_role_lookup(&Some(Role::new(1, 1, "a"))),
            CacheEvent::Hit
        );
    }
}
