//! `AppComponents`: wires every collaborator together and owns their
//! ordered startup/shutdown (`SPEC_FULL.md` §4.16), grounded on `main.rs` +
//! `server.rs`'s construction-then-cleanup-task pattern.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::cache::{CacheDAO, InMemoryKvStore};
use crate::config::Config;
use crate::message::MessageService;
use crate::metrics::Metrics;
use crate::registry::{InMemoryRegistry, ServiceInfo};
use crate::reporter::Reporter;
use crate::role::dao::{InMemoryRoleDao, RoleDao};
use crate::role::RoleManager;
use crate::router::Router;
use crate::scene::SceneManager;
use crate::session::{OfflineHook, SessionManager};

/// Bound applied to every shutdown step; a collaborator that won't stop in
/// time is logged and skipped rather than hanging the process
/// (`SPEC_FULL.md` §5 cancellation policy).
const SHUTDOWN_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Persists a role when its disconnect-grace timer fires, so a role that
/// never reconnects still gets saved (`SPEC_FULL.md` §4.8's SaveRole
/// transition).
struct SaveRoleOnOffline {
    role_manager: Arc<RoleManager>,
}

#[async_trait::async_trait]
impl OfflineHook for SaveRoleOnOffline {
    async fn on_offline(&self, role_id: crate::role::dao::RoleId) {
        if let Err(err) = self.role_manager.save_role(role_id).await {
            tracing::warn!(role_id, error = %err, "failed to save role on disconnect timeout");
        }
    }
}

/// Every long-lived collaborator the server is built from, plus the order
/// they start in and stop in (reverse of start).
pub struct AppComponents {
    pub config: Arc<Config>,
    pub role_manager: Arc<RoleManager>,
    pub session_manager: Arc<SessionManager>,
    pub scene_manager: Arc<SceneManager>,
    pub metrics: Arc<Metrics>,
    pub registry: Arc<InMemoryRegistry>,
    pub reporter: Option<Arc<Reporter<InMemoryRegistry>>>,
    pub message_service: Arc<MessageService>,
    pub router: Arc<Router>,
}

impl AppComponents {
    /// Builds every collaborator from `config`. Takes the opcode
    /// registration as a closure so callers can register gameplay handlers
    /// without this module needing to know about them.
    pub fn new<F>(config: Config, build_router: F) -> Self
    where
        F: FnOnce(crate::router::RouterBuilder) -> crate::router::RouterBuilder,
    {
        let config = Arc::new(config);

        let store = Arc::new(InMemoryKvStore::new());
        let cache = Arc::new(CacheDAO::new(store, &config.cache));
        let dao: Arc<dyn RoleDao> = Arc::new(InMemoryRoleDao::new());
        let role_manager = Arc::new(RoleManager::new(Arc::clone(&cache), dao));

        let session_manager = Arc::new(SessionManager::new(
            Duration::from_secs(config.session.disconnect_grace_secs),
            Arc::new(SaveRoleOnOffline {
                role_manager: Arc::clone(&role_manager),
            }),
            Arc::clone(&cache),
        ));

        let scene_manager = Arc::new(SceneManager::new());
        let metrics = Arc::new(Metrics::new(&config.metrics));
        let registry = Arc::new(InMemoryRegistry::new());

        let router = Arc::new(build_router(Router::builder()).build());

        let message_service = Arc::new(MessageService::new(
            Arc::clone(&role_manager),
            Arc::clone(&session_manager),
            Arc::clone(&router),
            Arc::clone(&metrics),
        ));

        let reporter = if config.registry.enabled && config.metrics.reporter_enabled {
            let info = ServiceInfo {
                service_name: config.registry.service_name.clone(),
                instance_id: Uuid::new_v4(),
                addr: config
                    .registry
                    .advertise_addr
                    .clone()
                    .unwrap_or_else(|| format!("0.0.0.0:{}", config.port)),
                metadata: std::collections::HashMap::new(),
            };
            Some(Arc::new(Reporter::from_config(
                Arc::clone(&registry),
                Arc::clone(&metrics),
                info,
                &config.metrics,
                Duration::from_secs(config.registry.lease_ttl_secs),
            )))
        } else {
            None
        };

        Self {
            config,
            role_manager,
            session_manager,
            scene_manager,
            metrics,
            registry,
            reporter,
            message_service,
            router,
        }
    }

    /// Starts background collaborators in dependency order: metrics
    /// sampling before the reporter, since the reporter's first publish
    /// reads a metrics snapshot.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.metrics.start();

        if let Some(reporter) = &self.reporter {
            reporter.start().await?;
        }

        Ok(())
    }

    /// Stops background collaborators in the reverse of `start` order,
    /// each bounded by `SHUTDOWN_STEP_TIMEOUT` so one wedged collaborator
    /// can't hang the whole shutdown sequence.
    pub async fn stop(&self) {
        if let Some(reporter) = &self.reporter {
            if tokio::time::timeout(SHUTDOWN_STEP_TIMEOUT, reporter.stop())
                .await
                .is_err()
            {
                tracing::warn!("reporter did not stop within the shutdown timeout");
            }
        }

        self.metrics.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::router::RoleContext;

    #[tokio::test]
    async fn build_wires_every_collaborator_and_starts_cleanly() {
        let app = AppComponents::new(Config::default(), |builder| {
            builder.register(1, |ctx: RoleContext, _: Bytes| async move {
                Ok(Bytes::from(ctx.role_id.to_string()))
            })
        });

        app.start().await.unwrap();
        assert!(app.router.is_registered(1));
        app.stop().await;
    }
}
