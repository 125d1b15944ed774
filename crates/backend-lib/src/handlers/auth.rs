// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Login and logout.
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{session_token, verify_password, SESSION_COOKIE};
use crate::error::AppError;
use crate::metrics as keys;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: String,
}

/// Verify credentials against the configured users and open a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let LoginRequest { username, password } = request;

    let Some(hash) = state.settings.users.get(&username).cloned() else {
        // Do the same scrypt work as a known user so timing does not leak names
        if let Some(decoy) = decoy_hash(&state) {
            tokio::task::spawn_blocking(move || verify_password(&decoy, &password)).await?;
        }
        counter!(keys::AUTH_REJECTED).increment(1);
        warn!(user = %username, "login for unknown user");
        return Err(AppError::Auth("invalid credentials".to_string()));
    };

    // scrypt verification blocks for a while
    let verified = tokio::task::spawn_blocking(move || verify_password(&hash, &password)).await?;
    if !verified {
        counter!(keys::AUTH_REJECTED).increment(1);
        warn!(user = %username, "login with wrong password");
        return Err(AppError::Auth("invalid credentials".to_string()));
    }

    let token = state.sessions.create(&username);
    counter!(keys::AUTH_LOGIN).increment(1);
    info!(user = %username, "user logged in");

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.settings.session_ttl_secs
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            user: username,
        }),
    ))
}

/// A configured hash to burn time against for unknown users. Picked
/// deterministically so the cost matches the configured scrypt params.
fn decoy_hash(state: &AppState) -> Option<String> {
    state
        .settings
        .users
        .iter()
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(_, hash)| hash.clone())
}

/// Drop the caller's session, if any, and clear the cookie
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token);
    }

    (
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
        )],
    )
}
