// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! Request/response handlers living next to the live chat socket.

pub mod auth;
pub mod messages;
