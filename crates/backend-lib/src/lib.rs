// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core functionality for the group chat server.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod ws_router;

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::chat::ChatHub;
use crate::config::Settings;

/// Application state shared across all handlers
pub struct AppState {
    /// The chat room
    pub hub: ChatHub,
    /// Session manager
    pub sessions: SessionManager,
    /// Settings
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state
    pub fn new(settings: Settings) -> Self {
        let hub = ChatHub::new(settings.chat.outbound_buffer);
        let sessions = SessionManager::new(settings.session_ttl());

        Self {
            hub,
            sessions,
            settings: Arc::new(settings),
        }
    }
}
