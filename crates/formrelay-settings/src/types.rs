//! Settings types.

use serde::{Deserialize, Serialize};

/// Relay configuration.
///
/// Only the listener and logging fields come from the historical deployment
/// (`HOST`, `PORT`, `LOG_LEVEL`, `RELOAD`); the rest bound resource usage.
/// None of them change protocol semantics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelaySettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind (`0` picks an ephemeral port).
    pub port: u16,
    /// Default log level (overridden by `RUST_LOG`).
    pub log_level: String,
    /// Auto-reload request. Reported at startup; a compiled binary does not reload.
    pub reload: bool,
    /// Maximum concurrent WebSocket sessions.
    pub max_connections: usize,
    /// Seconds between server Ping frames (`0` disables the heartbeat).
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence after which a session is closed.
    pub heartbeat_timeout_secs: u64,
    /// Maximum inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            log_level: "info".into(),
            reload: true,
            max_connections: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 1024 * 1024, // 1 MB
        }
    }
}

impl RelaySettings {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_connections == 0 {
            return Err(crate::SettingsError::NoConnectionCapacity);
        }
        if self.heartbeat_interval_secs > 0
            && self.heartbeat_timeout_secs < self.heartbeat_interval_secs
        {
            return Err(crate::SettingsError::HeartbeatTimeoutTooShort {
                interval_secs: self.heartbeat_interval_secs,
                timeout_secs: self.heartbeat_timeout_secs,
            });
        }
        Ok(())
    }
}
