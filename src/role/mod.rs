//! `RoleManager`: the three-tier read-through cache over `Role` records
//! (`SPEC_FULL.md` §4.7).

pub mod dao;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::CacheDAO;
use dao::{Role, RoleDao, RoleError, RoleId};

/// Holds every currently-active `Role` in memory and reaches through to the
/// cache, then the relational store, on a miss. No single-flight
/// deduplication is performed (`SPEC_FULL.md` §4.7, §9): concurrent loads of
/// the same absent role id may each independently hit the DB; all converge
/// on the same value so this costs throughput, not correctness.
pub struct RoleManager {
    roles: Arc<RwLock<HashMap<RoleId, Role>>>,
    cache: Arc<CacheDAO>,
    dao: Arc<dyn RoleDao>,
}

impl RoleManager {
    #[must_use]
    pub fn new(cache: Arc<CacheDAO>, dao: Arc<dyn RoleDao>) -> Self {
        Self {
            roles: Arc::new(RwLock::new(HashMap::new())),
            cache,
            dao,
        }
    }

    /// Non-loading read of a role already present in memory.
    pub async fn get_role(&self, id: RoleId) -> Option<Role> {
        self.roles.read().await.get(&id).cloned()
    }

    /// Memory -> cache -> relational store, populating memory synchronously
    /// and the cache asynchronously on a DB hit.
    pub async fn load_role(&self, id: RoleId) -> Result<Role, RoleError> {
        if let Some(role) = self.get_role(id).await {
            return Ok(role);
        }

        if let Ok(Some(role)) = self.cache.get_role(id).await {
            self.roles.write().await.insert(id, role.clone());
            return Ok(role);
        }

        let role = self.dao.get_by_id(id).await?;
        self.roles.write().await.insert(id, role.clone());

        let cache = Arc::clone(&self.cache);
        let write_back = role.clone();
        tokio::spawn(async move {
            if let Err(err) = cache.set_role(&write_back, None).await {
                tracing::warn!(role_id = id, error = %err, "failed to write role back to cache");
            }
        });

        Ok(role)
    }

    /// Persist the in-memory value via the relational DAO, then best-effort
    /// refresh the cache. Cache failures are logged, not propagated
    /// (`SPEC_FULL.md` §7).
    pub async fn save_role(&self, id: RoleId) -> Result<(), RoleError> {
        let Some(role) = self.get_role(id).await else {
            return Err(RoleError::NotFound);
        };

        self.dao.update(role.clone()).await?;

        if let Err(err) = self.cache.set_role(&role, None).await {
            tracing::warn!(role_id = id, error = %err, "failed to refresh role cache after save");
        }

        Ok(())
    }

    /// Apply a mutation to the in-memory role under the write lock. No
    /// transactionality beyond the lock itself (`SPEC_FULL.md` §4.7).
    pub async fn update_role_state<F>(&self, id: RoleId, f: F) -> Result<(), RoleError>
    where
        F: FnOnce(&mut Role),
    {
        let mut roles = self.roles.write().await;
        let role = roles.get_mut(&id).ok_or(RoleError::NotFound)?;
        f(role);
        Ok(())
    }

    /// Drop a role from memory without touching persistence.
    pub async fn mark_inactive(&self, id: RoleId) {
        self.roles.write().await.remove(&id);
    }

    pub async fn get_online_count(&self) -> usize {
        self.roles.read().await.len()
    }

    pub async fn get_all_online_role_ids(&self) -> Vec<RoleId> {
        self.roles.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryKvStore;
    use crate::config::CacheConfig;
    use crate::role::dao::InMemoryRoleDao;

    fn manager() -> RoleManager {
        let store = Arc::new(InMemoryKvStore::new());
        let cache = Arc::new(CacheDAO::new(store, &CacheConfig::default()));
        let dao: Arc<dyn RoleDao> = Arc::new(InMemoryRoleDao::new());
        RoleManager::new(cache, dao)
    }

    #[tokio::test]
    async fn load_role_cold_hits_dao_and_populates_memory() {
        let mgr = manager();
        mgr.dao.create(Role::new(1, 100, "alice")).await.unwrap();

        assert!(mgr.get_role(1).await.is_none());
        let loaded = mgr.load_role(1).await.unwrap();
        assert_eq!(loaded.id, 1);
        assert!(mgr.get_role(1).await.is_some());
    }

    #[tokio::test]
    async fn load_role_populates_cache_eventually() {
        let mgr = manager();
        mgr.dao.create(Role::new(1, 100, "alice")).await.unwrap();
        mgr.load_role(1).await.unwrap();

        // The cache write-back is spawned; give it a turn to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(mgr.cache.get_role(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn load_role_missing_everywhere_is_not_found() {
        let mgr = manager();
        assert!(matches!(mgr.load_role(42).await, Err(RoleError::NotFound)));
    }

    #[tokio::test]
    async fn concurrent_loads_of_same_id_converge() {
        let mgr = Arc::new(manager());
        mgr.dao.create(Role::new(1, 100, "alice")).await.unwrap();

        let a = Arc::clone(&mgr);
        let b = Arc::clone(&mgr);
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.load_role(1).await }),
            tokio::spawn(async move { b.load_role(1).await }),
        );
        assert_eq!(ra.unwrap().unwrap().id, rb.unwrap().unwrap().id);
    }

    #[tokio::test]
    async fn update_role_state_mutates_in_memory_value() {
        let mgr = manager();
        mgr.dao.create(Role::new(1, 100, "alice")).await.unwrap();
        mgr.load_role(1).await.unwrap();

        mgr.update_role_state(1, |role| role.gold += 50).await.unwrap();
        assert_eq!(mgr.get_role(1).await.unwrap().gold, 50);
    }

    #[tokio::test]
    async fn mark_inactive_drops_from_memory_only() {
        let mgr = manager();
        mgr.dao.create(Role::new(1, 100, "alice")).await.unwrap();
        mgr.load_role(1).await.unwrap();
        mgr.mark_inactive(1).await;

        assert!(mgr.get_role(1).await.is_none());
        assert!(mgr.dao.get_by_id(1).await.is_ok());
    }
}
