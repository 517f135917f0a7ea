//! `MessageService`: the per-message pipeline load/verify role -> ban gate
//! -> dispatch -> record (`SPEC_FULL.md` §4.12).

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::error::{CoreError, CoreResult};
use crate::metrics::Metrics;
use crate::role::dao::RoleId;
use crate::role::RoleManager;
use crate::router::{Router, RoleContext};
use crate::session::SessionManager;

pub struct MessageService {
    role_manager: Arc<RoleManager>,
    session_manager: Arc<SessionManager>,
    router: Arc<Router>,
    metrics: Arc<Metrics>,
}

impl MessageService {
    #[must_use]
    pub fn new(
        role_manager: Arc<RoleManager>,
        session_manager: Arc<SessionManager>,
        router: Arc<Router>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            role_manager,
            session_manager,
            router,
            metrics,
        }
    }

    /// Runs the full pipeline for one inbound message (`SPEC_FULL.md` §4.12
    /// steps 1-7):
    /// 1. its `Role` is loaded (memory/cache/DB read-through),
    /// 2. a banned role is rejected before dispatch,
    /// 3. the opcode is dispatched through the router,
    /// 4. outcome and latency are recorded on `Metrics`,
    /// 5. the handler's reply payload (or error) is returned to the caller.
    pub async fn handle_message(
        &self,
        role_id: RoleId,
        op_code: u32,
        payload: Bytes,
    ) -> CoreResult<Bytes> {
        let started = Instant::now();
        let result = self.handle_message_inner(role_id, op_code, payload).await;
        let ok = result.is_ok();
        self.metrics.record_message(op_code, ok, started.elapsed()).await;
        result
    }

    async fn handle_message_inner(
        &self,
        role_id: RoleId,
        op_code: u32,
        payload: Bytes,
    ) -> CoreResult<Bytes> {
        let role = self
            .role_manager
            .load_role(role_id)
            .await
            .map_err(|err| CoreError::not_found(err.to_string()))?;

        if role.is_banned() {
            return Err(CoreError::banned(format!("role {role_id} is banned")));
        }

        self.router
            .dispatch(op_code, RoleContext { role_id }, payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDAO, InMemoryKvStore};
    use crate::config::{CacheConfig, MetricsConfig};
    use crate::role::dao::{InMemoryRoleDao, Role, RoleDao};
    use crate::router::Handler;
    use crate::session::{NoopOfflineHook, SessionManager};
    use std::time::Duration;

    async fn service() -> (MessageService, Arc<SessionManager>, Arc<dyn RoleDao>) {
        let store = Arc::new(InMemoryKvStore::new());
        let cache = Arc::new(CacheDAO::new(store, &CacheConfig::default()));
        let dao: Arc<dyn RoleDao> = Arc::new(InMemoryRoleDao::new());
        let role_manager = Arc::new(RoleManager::new(Arc::clone(&cache), Arc::clone(&dao)));
        let session_manager = Arc::new(SessionManager::new(
            Duration::from_secs(60),
            Arc::new(NoopOfflineHook),
            cache,
        ));
        let router = Arc::new(
            Router::builder()
                .register(1, |ctx: RoleContext, _: Bytes| async move {
                    Ok(Bytes::from(ctx.role_id.to_string()))
                })
                .build(),
        );
        let metrics = Arc::new(Metrics::new(&MetricsConfig::default()));
        let service = MessageService::new(role_manager, Arc::clone(&session_manager), router, metrics);
        (service, session_manager, dao)
    }

    #[tokio::test]
    async fn dispatches_without_requiring_an_online_session() {
        let (service, _sessions, dao) = service().await;
        dao.create(Role::new(1, 100, "alice")).await.unwrap();

        let out = service.handle_message(1, 1, Bytes::new()).await.unwrap();
        assert_eq!(out, Bytes::from("1"));
    }

    #[tokio::test]
    async fn dispatches_for_an_online_unbanned_role() {
        let (service, sessions, dao) = service().await;
        dao.create(Role::new(1, 100, "alice")).await.unwrap();
        sessions.register_session(1, "gw-1").await;

        let out = service.handle_message(1, 1, Bytes::new()).await.unwrap();
        assert_eq!(out, Bytes::from("1"));
    }

    #[tokio::test]
    async fn banned_role_is_rejected_before_dispatch_even_without_a_session() {
        let (service, _sessions, dao) = service().await;
        let mut role = Role::new(1, 100, "alice");
        role.status = crate::role::dao::RoleStatus::Banned;
        dao.create(role).await.unwrap();

        let err = service.handle_message(1, 1, Bytes::new()).await.unwrap_err();
        assert_eq!(err.kind(), "banned");
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let (service, _sessions, _dao) = service().await;

        let err = service.handle_message(1, 1, Bytes::new()).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
