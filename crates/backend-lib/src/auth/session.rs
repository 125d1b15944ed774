// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::chat::Identity;

/// Session information
#[derive(Clone, Debug)]
pub struct Session {
    pub user: Identity,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl Session {
    fn is_live(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }
}

/// Token store shared by the HTTP and WebSocket surfaces
#[derive(Clone, Debug)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Create a session for `user` and return its token
    pub fn create(&self, user: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let now = SystemTime::now();
        self.sessions.insert(
            token.clone(),
            Session {
                user: user.to_string(),
                created_at: now,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Resolve a token to its user. Expired sessions are dropped on sight.
    pub fn resolve(&self, token: &str) -> Option<Identity> {
        let now = SystemTime::now();
        let user = {
            let session = self.sessions.get(token)?;
            session.is_live(now).then(|| session.user.clone())
        };

        if user.is_none() {
            self.sessions.remove(token);
        }
        user
    }

    /// Drop a session. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Remove every expired session, returning how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let now = SystemTime::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_live(now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "expired sessions swept");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
