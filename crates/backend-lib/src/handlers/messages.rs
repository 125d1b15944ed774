// ============================
// crates/backend-lib/src/handlers/messages.rs
// ============================
//! Out-of-band access to the chat log: moderation, per-user stats, health.
//!
//! These read and mutate the same log the live sockets use.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chat_common::{ChatMessage, MessageId};
use serde::{Deserialize, Serialize};

use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStats {
    pub user: String,
    pub messages: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub connections: usize,
    pub messages: usize,
}

/// Full log snapshot, oldest first
pub async fn list_messages(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ChatMessage>> {
    Json(state.hub.snapshot())
}

/// Delete one message. Connected viewers are not notified.
pub async fn delete_message(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<MessageId>,
) -> Result<StatusCode, AppError> {
    if state.hub.remove(id) {
        tracing::info!(message_id = id, admin = %admin, "message removed by moderator");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("message {id}")))
    }
}

/// How many messages in the log the caller wrote
pub async fn my_stats(
    AuthUser(user): AuthUser,
    State(state): State<Arc<AppState>>,
) -> Json<UserStats> {
    let messages = state.hub.messages_by(&user);
    Json(UserStats { user, messages })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        connections: state.hub.connection_count(),
        messages: state.hub.message_count(),
    })
}
