//! Package-level constants.

/// Current version of formrelay (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "formrelay";

/// Human-readable service title, returned by `GET /` and in the welcome envelope.
pub const SERVICE_TITLE: &str = "Form Automation Relay";

/// Path of the WebSocket endpoint.
pub const WS_PATH: &str = "/ws";

/// Path of the detailed health endpoint.
pub const HEALTH_PATH: &str = "/health";
