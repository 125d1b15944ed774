// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const WS_EVICTED: &str = "ws.evicted";
pub const CHAT_PUBLISHED: &str = "chat.published";
pub const CHAT_DELETED: &str = "chat.deleted";
pub const AUTH_LOGIN: &str = "auth.login";
pub const AUTH_REJECTED: &str = "auth.rejected";
