//! `GameHandler`: the HTTP/JSON adapter exposing `MessageService` as
//! `POST /v1/forward` (`SPEC_FULL.md` §1, §6 — `ForwardMessage` over
//! axum/JSON rather than gRPC). Grounded on `websocket/routes.rs`'s router
//! composition and `websocket/handler.rs`'s `State<Arc<T>>` extraction.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::CoreError;
use crate::message::MessageService;
use crate::metrics::Metrics;
use crate::role::dao::RoleId;

/// Shared state handed to every route handler.
pub struct AppState {
    pub message_service: Arc<MessageService>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Deserialize)]
pub struct ForwardMessageRequest {
    pub role_id: RoleId,
    pub op_code: u32,
    /// Base64-encoded opaque payload (`SPEC_FULL.md` §6).
    pub payload: String,
}

/// `{success, payload, error}` envelope (`SPEC_FULL.md` §6). `payload` is
/// base64-encoded and empty on failure; `error` is the stable `CoreError`
/// kind label and is `None` on success.
#[derive(Debug, Serialize)]
pub struct ForwardMessageResponse {
    pub success: bool,
    pub payload: String,
    pub error: Option<String>,
}

impl ForwardMessageResponse {
    fn ok(payload: String) -> Self {
        Self {
            success: true,
            payload,
            error: None,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Banned(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ForwardMessageResponse {
            success: false,
            payload: String::new(),
            error: Some(self.kind().to_string()),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the full router: `/v1/forward` for gameplay traffic, `/health`
/// and `/stats` for operational checks, matching the teacher's split
/// between a gameplay route and plain liveness/metrics routes
/// (`websocket/routes.rs::create_router`).
#[must_use]
pub fn create_router(cors_origins: &str) -> Router<Arc<AppState>> {
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();
        if origins.is_empty() {
            tracing::warn!("no valid CORS origins configured, falling back to permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    Router::new()
        .route("/v1/forward", post(forward_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn forward_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForwardMessageRequest>,
) -> Result<Json<ForwardMessageResponse>, CoreError> {
    let payload = base64::engine::general_purpose::STANDARD
        .decode(&req.payload)
        .map_err(|err| CoreError::invalid_argument(format!("invalid base64 payload: {err}")))?;

    let reply = state
        .message_service
        .handle_message(req.role_id, req.op_code, Bytes::from(payload))
        .await?;

    Ok(Json(ForwardMessageResponse::ok(
        base64::engine::general_purpose::STANDARD.encode(reply),
    )))
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<crate::metrics::Stats> {
    Json(state.metrics.get_stats())
}
