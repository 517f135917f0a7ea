//! Relational store interface for `Role` rows and its in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

pub type RoleId = i64;
pub type Uid = i64;

/// Authoritative player record (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    pub id: RoleId,
    pub uid: Uid,
    pub nickname: String,
    pub gold: i64,
    pub diamond: i64,
    pub level: u32,
    pub exp: u64,
    pub vip_level: u32,
    pub vip_exp: u64,
    pub status: RoleStatus,
    pub ban_expire_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Opaque per-player blobs (appearance, outfit, ...); kept untyped since
    /// their schema is gameplay-specific and out of scope here.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Role {
    #[must_use]
    pub fn new(id: RoleId, uid: Uid, nickname: impl Into<String>) -> Self {
        Self {
            id,
            uid,
            nickname: nickname.into(),
            gold: 0,
            diamond: 0,
            level: 1,
            exp: 0,
            vip_level: 0,
            vip_exp: 0,
            status: RoleStatus::Normal,
            ban_expire_at: None,
            last_login_at: None,
            attributes: HashMap::new(),
        }
    }

    /// A role is banned iff its status is `Banned` and the ban has not lapsed
    /// (`SPEC_FULL.md` §3 invariant).
    #[must_use]
    pub fn is_banned(&self) -> bool {
        if self.status != RoleStatus::Banned {
            return false;
        }
        match self.ban_expire_at {
            Some(expire_at) => chrono::Utc::now() < expire_at,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    Normal,
    Banned,
}

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("role not found")]
    NotFound,
    #[error("nickname already exists: {0}")]
    NicknameExists(String),
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Relational store interface (`SPEC_FULL.md` §6).
#[async_trait]
pub trait RoleDao: Send + Sync {
    async fn get_by_id(&self, id: RoleId) -> Result<Role, RoleError>;
    async fn get_by_uid(&self, uid: Uid) -> Result<Role, RoleError>;
    async fn list_by_uid(&self, uid: Uid) -> Result<Vec<Role>, RoleError>;
    async fn create(&self, role: Role) -> Result<Role, RoleError>;
    async fn update(&self, role: Role) -> Result<Role, RoleError>;
    async fn update_last_login(&self, id: RoleId) -> Result<(), RoleError>;
    async fn check_nickname_exists(&self, nickname: &str) -> Result<bool, RoleError>;
}

/// In-memory `RoleDao`, modeled on `InMemoryDatabase`'s dual-index shape:
/// a primary map plus a secondary index to support the `by_uid` lookups
/// without a full scan.
pub struct InMemoryRoleDao {
    roles: Arc<RwLock<HashMap<RoleId, Role>>>,
    by_uid: Arc<RwLock<HashMap<Uid, Vec<RoleId>>>>,
}

impl InMemoryRoleDao {
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: Arc::new(RwLock::new(HashMap::new())),
            by_uid: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRoleDao {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleDao for InMemoryRoleDao {
    async fn get_by_id(&self, id: RoleId) -> Result<Role, RoleError> {
        self.roles
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RoleError::NotFound)
    }

    async fn get_by_uid(&self, uid: Uid) -> Result<Role, RoleError> {
        let ids = self.by_uid.read().await;
        let Some(first_id) = ids.get(&uid).and_then(|v| v.first().copied()) else {
            return Err(RoleError::NotFound);
        };
        drop(ids);
        self.get_by_id(first_id).await
    }

    async fn list_by_uid(&self, uid: Uid) -> Result<Vec<Role>, RoleError> {
        let ids = self
            .by_uid
            .read()
            .await
            .get(&uid)
            .cloned()
            .unwrap_or_default();
        let roles = self.roles.read().await;
        Ok(ids.iter().filter_map(|id| roles.get(id).cloned()).collect())
    }

    async fn create(&self, role: Role) -> Result<Role, RoleError> {
        // Lock ordering: roles first, then by_uid, and both held together so a
        // reader never observes a role without its uid index entry.
        let mut roles = self.roles.write().await;
        let mut by_uid = self.by_uid.write().await;

        if roles.values().any(|r| r.nickname == role.nickname) {
            return Err(RoleError::NicknameExists(role.nickname));
        }

        by_uid.entry(role.uid).or_default().push(role.id);
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update(&self, role: Role) -> Result<Role, RoleError> {
        let mut roles = self.roles.write().await;
        if !roles.contains_key(&role.id) {
            return Err(RoleError::NotFound);
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update_last_login(&self, id: RoleId) -> Result<(), RoleError> {
        let mut roles = self.roles.write().await;
        let role = roles.get_mut(&id).ok_or(RoleError::NotFound)?;
        role.last_login_at = Some(chrono::Utc::now());
        Ok(())
    }

    async fn check_nickname_exists(&self, nickname: &str) -> Result<bool, RoleError> {
        Ok(self.roles.read().await.values().any(|r| r.nickname == nickname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let dao = InMemoryRoleDao::new();
        let role = Role::new(1, 100, "alice");
        dao.create(role.clone()).await.unwrap();

        let fetched = dao.get_by_id(1).await.unwrap();
        assert_eq!(fetched, role);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_nickname() {
        let dao = InMemoryRoleDao::new();
        dao.create(Role::new(1, 100, "alice")).await.unwrap();
        let err = dao.create(Role::new(2, 200, "alice")).await.unwrap_err();
        assert!(matches!(err, RoleError::NicknameExists(_)));
    }

    #[tokio::test]
    async fn get_by_uid_finds_first_role() {
        let dao = InMemoryRoleDao::new();
        dao.create(Role::new(1, 100, "alice")).await.unwrap();
        dao.create(Role::new(2, 100, "alice2")).await.unwrap();

        let roles = dao.list_by_uid(100).await.unwrap();
        assert_eq!(roles.len(), 2);
    }

    #[tokio::test]
    async fn get_by_id_missing_is_not_found() {
        let dao = InMemoryRoleDao::new();
        assert!(matches!(dao.get_by_id(999).await, Err(RoleError::NotFound)));
    }

    #[tokio::test]
    async fn update_last_login_sets_timestamp() {
        let dao = InMemoryRoleDao::new();
        dao.create(Role::new(1, 100, "alice")).await.unwrap();
        dao.update_last_login(1).await.unwrap();
        let role = dao.get_by_id(1).await.unwrap();
        assert!(role.last_login_at.is_some());
    }

    #[test]
    fn role_is_banned_honors_expiry() {
        let mut role = Role::new(1, 100, "alice");
        role.status = RoleStatus::Banned;
        assert!(role.is_banned());

        role.ban_expire_at = Some(chrono::Utc::now() - chrono::Duration::seconds(1));
        assert!(!role.is_banned());

        role.ban_expire_at = Some(chrono::Utc::now() + chrono::Duration::seconds(60));
        assert!(role.is_banned());
    }
}
