//! Router assembly.
//!
//! ```text
//! GET    /health
//! POST   /clerk-users-webhook
//! GET    /api/me/status
//! GET    /api/me
//! GET    /api/conversations
//! POST   /api/conversations
//! GET    /api/conversations/:id
//! PATCH  /api/conversations/:id
//! DELETE /api/conversations/:id
//! GET    /api/conversations/:id/messages
//! POST   /api/conversations/:id/messages
//! GET    /api/conversations/:id/live      (WebSocket)
//! POST   /api/messages/:id/cancel
//! ```

use std::time::Duration;

use axum::{
    http::HeaderValue,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::handlers::{
    cancel_message, create_conversation, current_user, get_conversation, list_conversations,
    list_messages, login_status, remove_conversation, rename_conversation, send_message,
};
use super::middleware::{auth_middleware, require_access};
use super::state::AppState;
use super::webhook::clerk_users_webhook;
use crate::adapters::websocket::{websocket_router, WebSocketState};

/// Cross-cutting HTTP settings taken from `ServerConfig`.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builds the complete application router.
pub fn build_router(state: AppState, live: WebSocketState, options: RouterOptions) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/clerk-users-webhook", post(clerk_users_webhook))
        .with_state(state.clone())
        .nest("/api", api_router(state, live))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(options.request_timeout))
                .layer(CompressionLayer::new()),
        )
        .layer(cors_layer(&options.cors_origins))
}

/// Routes under `/api`. Every route sees the bearer-token middleware; all
/// but the login status also require an allowed, synced user.
fn api_router(state: AppState, live: WebSocketState) -> Router {
    let chat = Router::new()
        .route("/me", get(current_user))
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/:id",
            get(get_conversation)
                .patch(rename_conversation)
                .delete(remove_conversation),
        )
        .route(
            "/conversations/:id/messages",
            get(list_messages).post(send_message),
        )
        .route("/messages/:id/cancel", post(cancel_message))
        .route_layer(middleware::from_fn_with_state(
            state.access.clone(),
            require_access,
        ));

    let sessions = state.sessions.clone();

    Router::new()
        .route("/me/status", get(login_status))
        .merge(chat)
        .with_state(state)
        .merge(websocket_router().with_state(live))
        .layer(middleware::from_fn_with_state(sessions, auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
