//! Live group chat: message log, connection registry, fan-out and the
//! per-connection session loop.

mod hub;
mod log;
mod registry;
pub mod session;

pub use hub::{ChatHub, Subscription, DEFAULT_OUTBOUND_BUFFER};
pub use log::MessageLog;
pub use registry::{Connection, ConnectionId, ConnectionRegistry, Identity};
pub use session::run_session;
