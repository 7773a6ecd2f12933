//! `/` and `/health` response bodies.

use serde::Serialize;

use crate::websocket::registry::{ConnectionRegistry, SessionSnapshot};

/// `GET /` body.
#[derive(Debug, Clone, Serialize)]
pub struct RootResponse {
    /// Service banner.
    pub message: String,
    /// Always `"running"`.
    pub status: &'static str,
    /// Live WebSocket sessions.
    pub active_connections: usize,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the server is answering.
    pub status: &'static str,
    /// RFC 3339.
    pub timestamp: String,
    /// Live WebSocket sessions.
    pub active_connections: usize,
    /// Per-session metadata in admission order.
    pub connection_details: Vec<SessionSnapshot>,
}

/// Build the root banner.
pub fn root(registry: &ConnectionRegistry) -> RootResponse {
    RootResponse {
        message: format!("{} WebSocket API", formrelay_core::constants::SERVICE_TITLE),
        status: "running",
        active_connections: registry.active_count(),
    }
}

/// Build the health report.
///
/// Count and details come from a single snapshot so they always agree.
pub fn health_check(registry: &ConnectionRegistry) -> HealthResponse {
    let connection_details = registry.snapshot();
    HealthResponse {
        status: "healthy",
        timestamp: formrelay_core::time::now_wire(),
        active_connections: connection_details.len(),
        connection_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::transport::ChannelSink;
    use formrelay_core::ids::ClientId;
    use std::sync::Arc;

    #[test]
    fn root_reports_running() {
        let registry = ConnectionRegistry::new(4);
        let resp = root(&registry);
        assert_eq!(resp.status, "running");
        assert_eq!(resp.active_connections, 0);
        assert_eq!(resp.message, "Form Automation Relay WebSocket API");
    }

    #[test]
    fn health_empty_registry() {
        let registry = ConnectionRegistry::new(4);
        let json = serde_json::to_value(health_check(&registry)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["active_connections"], 0);
        assert_eq!(json["connection_details"], serde_json::json!([]));
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn health_lists_sessions() {
        let registry = ConnectionRegistry::new(4);
        let (sink, _rx) = ChannelSink::channel(1);
        let _ = registry
            .connect(Arc::new(sink), Some(ClientId::from("ext")))
            .unwrap();

        let resp = health_check(&registry);
        assert_eq!(resp.active_connections, 1);
        assert_eq!(resp.connection_details[0].client_id.as_str(), "ext");
        assert_eq!(root(&registry).active_connections, 1);
    }
}
