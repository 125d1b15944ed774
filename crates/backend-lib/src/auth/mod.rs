// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication: password hashes, session tokens and identity extractors.

pub mod extract;
pub mod password;
pub mod session;

pub use extract::{session_token, AdminUser, AuthUser, SESSION_COOKIE};
pub use password::{hash_password, hash_password_with, verify_password};
pub use session::{Session, SessionManager};
