// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "chat.toml";

/// Prefix for environment overrides, nested keys split on `__`
pub const ENV_PREFIX: &str = "CHAT_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Identity allowed to run moderation operations
    pub admin_user: String,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// Username to scrypt PHC hash
    pub users: HashMap<String, String>,
    /// Live chat tuning
    pub chat: ChatSettings,
}

/// Live chat settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Depth of each connection's outbound queue. A connection whose queue
    /// is full when a message is published is dropped, so a burst of more
    /// than this many publishes before its writer catches up disconnects
    /// even a healthy client.
    pub outbound_buffer: usize,
    /// Close connections that send nothing for this long
    pub idle_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            admin_user: "admin".to_string(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            users: HashMap::new(),
            chat: ChatSettings::default(),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            idle_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load from `chat.toml` in the working directory plus environment
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from defaults, then the given TOML file (if it exists), then
    /// `CHAT_*` environment variables. The result is validated.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.admin_user.trim().is_empty() {
            return Err(AppError::InvalidInput("admin_user must not be empty".into()));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::InvalidInput(format!(
                "unknown log_level {:?}",
                self.log_level
            )));
        }
        if self.session_ttl_secs == 0 {
            return Err(AppError::InvalidInput("session_ttl_secs must be > 0".into()));
        }
        if self.chat.outbound_buffer == 0 {
            return Err(AppError::InvalidInput("chat.outbound_buffer must be > 0".into()));
        }
        if self.chat.idle_timeout_secs == Some(0) {
            return Err(AppError::InvalidInput(
                "chat.idle_timeout_secs must be > 0 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.chat.idle_timeout_secs.map(Duration::from_secs)
    }
}
