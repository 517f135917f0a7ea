//! Opcode dispatch table (`SPEC_FULL.md` §4.10). Built once at startup via
//! [`RouterBuilder`] and frozen into an immutable [`Router`]: handlers are
//! never added or removed at runtime (`SPEC_FULL.md` §9 — "immutable
//! opcode table" open-question decision), so dispatch never takes a lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{CoreError, CoreResult};
use crate::role::dao::RoleId;

pub type OpCode = u32;

/// Context handed to every handler: who sent the message, with no access
/// to transport-level details (`SPEC_FULL.md` §4.10 keeps handlers
/// transport-agnostic so the same table serves any `GameHandler` adapter).
#[derive(Debug, Clone)]
pub struct RoleContext {
    pub role_id: RoleId,
}

/// One opcode's business logic. Handlers receive and return an opaque
/// payload; the concrete message types live above this layer.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &RoleContext, payload: Bytes) -> CoreResult<Bytes>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(RoleContext, Bytes) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = CoreResult<Bytes>> + Send,
{
    async fn handle(&self, ctx: &RoleContext, payload: Bytes) -> CoreResult<Bytes> {
        (self)(ctx.clone(), payload).await
    }
}

/// Mutable builder; call [`RouterBuilder::build`] once all opcodes are
/// registered to get the immutable [`Router`] used at serve time.
#[derive(Default)]
pub struct RouterBuilder {
    handlers: HashMap<OpCode, Arc<dyn Handler>>,
}

impl RouterBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `op_code`. Panics if `op_code` is already
    /// registered: a duplicate registration is a startup wiring bug, not a
    /// runtime condition to recover from.
    #[must_use]
    pub fn register(mut self, op_code: OpCode, handler: impl Handler + 'static) -> Self {
        if self.handlers.insert(op_code, Arc::new(handler)).is_some() {
            panic!("opcode {op_code} registered more than once");
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Router {
        Router {
            handlers: self.handlers,
        }
    }
}

/// Immutable opcode -> handler table.
pub struct Router {
    handlers: HashMap<OpCode, Arc<dyn Handler>>,
}

impl Router {
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub async fn dispatch(&self, op_code: OpCode, ctx: RoleContext, payload: Bytes) -> CoreResult<Bytes> {
        let handler = self
            .handlers
            .get(&op_code)
            .ok_or_else(|| CoreError::invalid_argument(format!("unknown opcode {op_code}")))?;
        handler.handle(&ctx, payload).await
    }

    #[must_use]
    pub fn is_registered(&self, op_code: OpCode) -> bool {
        self.handlers.contains_key(&op_code)
    }
}

/// Thin adapter that pins a `role_id` and forwards through a shared
/// [`Router`], so callers that already know which role a message came from
/// don't have to build a [`RoleContext`] by hand.
pub struct RoleRouter {
    router: Arc<Router>,
}

impl RoleRouter {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub async fn dispatch_for_role(
        &self,
        role_id: RoleId,
        op_code: OpCode,
        payload: Bytes,
    ) -> CoreResult<Bytes> {
        self.router
            .dispatch(op_code, RoleContext { role_id }, payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_handler() -> impl Handler + 'static {
        |_ctx: RoleContext, payload: Bytes| async move { Ok(payload) }
    }

    #[tokio::test]
    async fn dispatch_routes_to_registered_handler() {
        let router = Router::builder().register(1, echo_handler()).build();
        let ctx = RoleContext { role_id: 7 };
        let out = router.dispatch(1, ctx, Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(out, Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn dispatch_unknown_opcode_is_invalid_argument() {
        let router = Router::builder().build();
        let ctx = RoleContext { role_id: 7 };
        let err = router.dispatch(999, ctx, Bytes::new()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn duplicate_registration_panics() {
        Router::builder().register(1, echo_handler()).register(1, echo_handler());
    }

    #[tokio::test]
    async fn role_router_injects_role_id() {
        let router = Arc::new(
            Router::builder()
                .register(5, |ctx: RoleContext, _payload: Bytes| async move {
                    Ok(Bytes::from(ctx.role_id.to_string()))
                })
                .build(),
        );
        let role_router = RoleRouter::new(router);
        let out = role_router.dispatch_for_role(42, 5, Bytes::new()).await.unwrap();
        assert_eq!(out, Bytes::from("42"));
    }
}
