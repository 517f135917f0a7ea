//! `Session` binding and the `SessionManager` state machine (`SPEC_FULL.md` §4.8).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::CacheDAO;
use crate::role::dao::RoleId;

/// Binding of a role to a specific gateway instance (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub role_id: RoleId,
    pub session_id: Uuid,
    pub gateway_addr: String,
    pub connected_at: chrono::DateTime<chrono::Utc>,
    pub state: RoleSessionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSessionState {
    Online,
    Disconnected,
    Offline,
}

struct SessionEntry {
    session: Session,
    disconnected_at: Option<chrono::DateTime<chrono::Utc>>,
    timer: Option<JoinHandle<()>>,
}

/// Callback invoked when a disconnect-grace timer fires for a role, so the
/// caller can `SaveRole` before the session is torn down (`SPEC_FULL.md` §4.8).
#[async_trait::async_trait]
pub trait OfflineHook: Send + Sync {
    async fn on_offline(&self, role_id: RoleId);
}

/// No-op hook used where a caller doesn't need offline notification (tests,
/// or a deployment that persists on every write instead of on disconnect).
pub struct NoopOfflineHook;

#[async_trait::async_trait]
impl OfflineHook for NoopOfflineHook {
    async fn on_offline(&self, _role_id: RoleId) {}
}

/// Per-role session state machine. Locking order note (`SPEC_FULL.md` §5):
/// callers must take this manager's lock before any per-Scene lock, never
/// the reverse.
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<RoleId, SessionEntry>>>,
    disconnect_grace: Duration,
    offline_hook: Arc<dyn OfflineHook>,
    cache: Arc<CacheDAO>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        disconnect_grace: Duration,
        offline_hook: Arc<dyn OfflineHook>,
        cache: Arc<CacheDAO>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            disconnect_grace,
            offline_hook,
            cache,
        }
    }

    /// Write the session and online marker to cache; failures are logged
    /// rather than propagated, matching `SPEC_FULL.md` §7's cache-degrades
    /// policy.
    async fn refresh_cache_markers(&self, session: &Session) {
        if let Err(err) = self.cache.set_session(session, None).await {
            tracing::warn!(role_id = session.role_id, error = %err, "failed to write session to cache");
        }
        if let Err(err) = self.cache.set_online_marker(session.role_id).await {
            tracing::warn!(role_id = session.role_id, error = %err, "failed to set online marker");
        }
    }

    async fn clear_cache_markers(&self, role_id: RoleId) {
        if let Err(err) = self.cache.delete_session(role_id).await {
            tracing::warn!(role_id, error = %err, "failed to delete session from cache");
        }
        if let Err(err) = self.cache.clear_online_marker(role_id).await {
            tracing::warn!(role_id, error = %err, "failed to clear online marker");
        }
    }

    /// Bind or rebind a role to a gateway. Cancels any pending disconnect
    /// timer, matching both the "(none) -> Online" and "Disconnected ->
    /// Online" transitions in `SPEC_FULL.md` §4.8's table.
    pub async fn register_session(&self, role_id: RoleId, gateway_addr: impl Into<String>) -> Session {
        let session = {
            let mut sessions = self.sessions.write().await;
            if let Some(entry) = sessions.get_mut(&role_id) {
                if let Some(timer) = entry.timer.take() {
                    timer.abort();
                }
                entry.session.session_id = Uuid::new_v4();
                entry.session.gateway_addr = gateway_addr.into();
                entry.session.connected_at = chrono::Utc::now();
                entry.session.state = RoleSessionState::Online;
                entry.disconnected_at = None;
                entry.session.clone()
            } else {
                let session = Session {
                    role_id,
                    session_id: Uuid::new_v4(),
                    gateway_addr: gateway_addr.into(),
                    connected_at: chrono::Utc::now(),
                    state: RoleSessionState::Online,
                };
                sessions.insert(
                    role_id,
                    SessionEntry {
                        session: session.clone(),
                        disconnected_at: None,
                        timer: None,
                    },
                );
                session
            }
        };

        self.refresh_cache_markers(&session).await;
        session
    }

    /// Online -> Disconnected: stamp the time and arm the one-shot grace timer.
    pub async fn set_disconnected(self: &Arc<Self>, role_id: RoleId) {
        let mut sessions = self.sessions.write().await;
        let Some(entry) = sessions.get_mut(&role_id) else {
            return;
        };
        if entry.session.state != RoleSessionState::Online {
            return;
        }
        entry.session.state = RoleSessionState::Disconnected;
        entry.disconnected_at = Some(chrono::Utc::now());

        let manager = Arc::clone(self);
        let grace = self.disconnect_grace;
        entry.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            manager.fire_disconnect_timer(role_id).await;
        }));
    }

    async fn fire_disconnect_timer(&self, role_id: RoleId) {
        {
            let mut sessions = self.sessions.write().await;
            let Some(entry) = sessions.get(&role_id) else {
                return;
            };
            // Re-check state: a RegisterSession between the sleep ending and
            // this lock acquisition must win over the stale timer firing.
            if entry.session.state != RoleSessionState::Disconnected {
                return;
            }
            sessions.remove(&role_id);
        }
        self.offline_hook.on_offline(role_id).await;
        self.clear_cache_markers(role_id).await;
    }

    /// Unconditional teardown; cancels any timer and removes the session.
    pub async fn unregister_session(&self, role_id: RoleId) {
        {
            let mut sessions = self.sessions.write().await;
            let Some(mut entry) = sessions.remove(&role_id) else {
                return;
            };
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
        }
        self.clear_cache_markers(role_id).await;
    }

    pub async fn get_session(&self, role_id: RoleId) -> Option<Session> {
        self.sessions.read().await.get(&role_id).map(|e| e.session.clone())
    }

    pub async fn is_online(&self, role_id: RoleId) -> bool {
        self.sessions
            .read()
            .await
            .get(&role_id)
            .is_some_and(|e| e.session.state == RoleSessionState::Online)
    }

    pub async fn get_gateway_addr(&self, role_id: RoleId) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(&role_id)
            .map(|e| e.session.gateway_addr.clone())
    }

    pub async fn get_online_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|e| e.session.state == RoleSessionState::Online)
            .count()
    }
}
