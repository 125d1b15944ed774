// ============================
// crates/backend-lib/src/ws_router.rs
// ============================
//! HTTP router and WebSocket admission.
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::auth::AuthUser;
use crate::chat::run_session;
use crate::handlers::{auth, messages};
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/messages", get(messages::list_messages))
        .route("/api/messages/{id}", delete(messages::delete_message))
        .route("/api/me/stats", get(messages::my_stats))
        .route("/health", get(messages::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for WebSocket connections.
///
/// The identity is resolved before the upgrade; unauthenticated callers get
/// a 401 and never reach the chat room.
pub async fn ws_handler(
    AuthUser(user): AuthUser,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    debug!(user = %user, "upgrading chat connection");

    let hub = state.hub.clone();
    let idle_timeout = state.settings.idle_timeout();
    ws.on_upgrade(move |socket| run_session(socket, hub, user, idle_timeout))
}
