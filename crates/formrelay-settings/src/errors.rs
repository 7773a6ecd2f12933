//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons the relay refuses to start with the configured settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON or has a field of the wrong type.
    #[error("invalid settings file {}: {source}", path.display())]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// `maxConnections` would admit no clients.
    #[error("maxConnections must be at least 1")]
    NoConnectionCapacity,
    /// The heartbeat would close healthy clients before the next ping.
    #[error("heartbeatTimeoutSecs ({timeout_secs}) must be >= heartbeatIntervalSecs ({interval_secs})")]
    HeartbeatTimeoutTooShort {
        /// Configured ping interval.
        interval_secs: u64,
        /// Configured silence timeout.
        timeout_secs: u64,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn read_error_names_file_and_keeps_source() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/formrelay.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/formrelay.json"));
        assert!(msg.contains("denied"));
        assert!(err.source().is_some());
    }

    #[test]
    fn parse_error_names_file() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("relay.json"),
            source,
        };
        assert!(err.to_string().starts_with("invalid settings file relay.json"));
    }

    #[test]
    fn validation_messages_use_file_keys() {
        assert_eq!(
            SettingsError::NoConnectionCapacity.to_string(),
            "maxConnections must be at least 1"
        );
        let err = SettingsError::HeartbeatTimeoutTooShort {
            interval_secs: 30,
            timeout_secs: 10,
        };
        assert_eq!(
            err.to_string(),
            "heartbeatTimeoutSecs (10) must be >= heartbeatIntervalSecs (30)"
        );
    }
}
