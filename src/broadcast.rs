//! `Broadcaster`: the pluggable extension point for server-initiated pushes
//! to online roles (`SPEC_FULL.md` §4.17). No concrete fan-out transport is
//! in scope here; a deployment wires a real implementation (e.g. one that
//! writes back through a gateway connection) behind this trait.

use async_trait::async_trait;

use crate::role::dao::RoleId;

/// One outbound push: an opaque payload destined for a role, or for every
/// role currently present in a scene.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn send_to_role(&self, role_id: RoleId, payload: &[u8]) -> anyhow::Result<()>;
    async fn send_to_roles(&self, role_ids: &[RoleId], payload: &[u8]) -> anyhow::Result<()> {
        for &role_id in role_ids {
            self.send_to_role(role_id, payload).await?;
        }
        Ok(())
    }
}

/// Default used where no transport is wired yet (tests, or a deployment
/// that only needs request/response `ForwardMessage` traffic).
#[derive(Debug, Default)]
pub struct NoopBroadcaster;

#[async_trait]
impl Broadcaster for NoopBroadcaster {
    async fn send_to_role(&self, _role_id: RoleId, _payload: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }
}
