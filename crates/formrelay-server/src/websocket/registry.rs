//! Connection registry: admission, eviction, and fan-out for live sessions.
//!
//! Sessions live in an arena keyed by [`ConnectionId`]. The table is the only
//! shared mutable state in the relay and is guarded by a single lock that is
//! never held across an `.await`: writers take it briefly to insert or
//! remove, and sends work on `Arc<Session>` clones taken under the lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use formrelay_core::ids::{ClientId, ConnectionId};
use formrelay_core::time;
use metrics::{counter, gauge};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::envelope::Outbound;
use super::transport::MessageSink;
use crate::errors::RegistryError;
use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL, WS_REJECTED_TOTAL,
    WS_SEND_FAILURES_TOTAL,
};

/// One live connection.
pub struct Session {
    /// Arena key.
    pub id: ConnectionId,
    /// Client label.
    pub client_id: ClientId,
    /// Admission time.
    pub connected_at: DateTime<Utc>,
    last_activity: Mutex<DateTime<Utc>>,
    sink: Arc<dyn MessageSink>,
}

impl Session {
    /// Time of the last successful outbound send (or admission).
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    /// The transport handle.
    pub fn sink(&self) -> &Arc<dyn MessageSink> {
        &self.sink
    }

    fn touch(&self) {
        *self.last_activity.lock() = time::now();
    }

    /// Point-in-time view for observability.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            client_id: self.client_id.clone(),
            connected_at: time::to_wire(&self.connected_at),
            last_activity: time::to_wire(&self.last_activity()),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

/// Serializable session metadata (the `/health` connection detail shape).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Client label.
    pub client_id: ClientId,
    /// Admission time (RFC 3339).
    pub connected_at: String,
    /// Last successful send (RFC 3339).
    pub last_activity: String,
}

/// Outcome of a [`ConnectionRegistry::broadcast`] sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions that accepted the message.
    pub delivered: usize,
    /// Sessions whose write failed and were evicted.
    pub evicted: Vec<ConnectionId>,
}

/// Owns the set of live sessions.
pub struct ConnectionRegistry {
    sessions: RwLock<BTreeMap<ConnectionId, Arc<Session>>>,
    next_id: AtomicU64,
    max_connections: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry admitting at most `max_connections` sessions.
    pub fn new(max_connections: usize) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            max_connections,
        }
    }

    /// Admit an accepted transport.
    ///
    /// `client_id` falls back to `client_<n>` where `n` is the connection
    /// sequence number, so fallback labels never repeat within a process.
    pub fn connect(
        &self,
        sink: Arc<dyn MessageSink>,
        client_id: Option<ClientId>,
    ) -> Result<Arc<Session>, RegistryError> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_connections {
            counter!(WS_REJECTED_TOTAL).increment(1);
            return Err(RegistryError::AtCapacity {
                limit: self.max_connections,
            });
        }

        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = time::now();
        let session = Arc::new(Session {
            id,
            client_id: client_id.unwrap_or_else(|| ClientId::fallback(id)),
            connected_at: now,
            last_activity: Mutex::new(now),
            sink,
        });
        let _ = sessions.insert(id, session.clone());
        let active = sessions.len();
        drop(sessions);

        info!(client_id = %session.client_id, conn_id = %id, active, "client connected");
        counter!(WS_CONNECTIONS_TOTAL).increment(1);
        record_active(active);
        Ok(session)
    }

    /// Remove a session. Returns whether it was present.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut sessions = self.sessions.write();
        let removed = sessions.remove(&id);
        let active = sessions.len();
        drop(sessions);

        match removed {
            Some(session) => {
                info!(client_id = %session.client_id, conn_id = %id, active, "client disconnected");
                counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
                record_active(active);
                true
            }
            None => false,
        }
    }

    /// Look up a live session.
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Session>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Write `text` to one session.
    ///
    /// A failed write evicts the session. Returns `true` on success, `false`
    /// if the write failed or the session is not registered.
    pub async fn send_to(&self, id: ConnectionId, text: &str) -> bool {
        let Some(session) = self.get(id) else {
            debug!(conn_id = %id, "send to unknown connection ignored");
            return false;
        };
        match session.sink.send_text(text).await {
            Ok(()) => {
                session.touch();
                true
            }
            Err(e) => {
                warn!(client_id = %session.client_id, conn_id = %id, error = %e, "error sending message");
                counter!(WS_SEND_FAILURES_TOTAL).increment(1);
                let _ = self.disconnect(id);
                false
            }
        }
    }

    /// Serialize and send an envelope to one session.
    pub async fn send_envelope(&self, id: ConnectionId, envelope: &Outbound) -> bool {
        match serde_json::to_string(envelope) {
            Ok(json) => self.send_to(id, &json).await,
            Err(e) => {
                error!(conn_id = %id, error = %e, "failed to serialize envelope");
                false
            }
        }
    }

    /// Send `text` to every session registered at call time.
    ///
    /// Writes run concurrently against a snapshot of the table. Sessions
    /// whose write fails are evicted after the sweep completes.
    pub async fn broadcast(&self, text: &str) -> BroadcastReport {
        let targets: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();
        debug!(recipients = targets.len(), "broadcast");

        let results = futures::future::join_all(targets.iter().map(|session| async move {
            let outcome = session.sink.send_text(text).await;
            (session, outcome)
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (session, outcome) in results {
            match outcome {
                Ok(()) => {
                    session.touch();
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(client_id = %session.client_id, conn_id = %session.id, error = %e, "error broadcasting to client");
                    counter!(WS_SEND_FAILURES_TOTAL).increment(1);
                    report.evicted.push(session.id);
                }
            }
        }
        for id in &report.evicted {
            let _ = self.disconnect(*id);
        }
        report
    }

    /// Serialize and broadcast an envelope.
    pub async fn broadcast_envelope(&self, envelope: &Outbound) -> BroadcastReport {
        match serde_json::to_string(envelope) {
            Ok(json) => self.broadcast(&json).await,
            Err(e) => {
                error!(error = %e, "failed to serialize broadcast envelope");
                BroadcastReport::default()
            }
        }
    }

    /// Number of live sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Metadata of all live sessions in admission order.
    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.sessions.read().values().map(|s| s.snapshot()).collect()
    }

    /// Configured admission bound.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_active(active: usize) {
    gauge!(WS_CONNECTIONS_ACTIVE).set(active as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::websocket::transport::ChannelSink;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct BrokenSink;

    #[async_trait]
    impl MessageSink for BrokenSink {
        async fn send_text(&self, _text: &str) -> Result<(), TransportError> {
            Err(TransportError::Send("connection reset by peer".into()))
        }

        async fn close(&self) {}
    }

    fn channel_session(
        registry: &ConnectionRegistry,
        client_id: Option<&str>,
    ) -> (Arc<Session>, mpsc::Receiver<String>) {
        let (sink, rx) = ChannelSink::channel(32);
        let session = registry
            .connect(Arc::new(sink), client_id.map(ClientId::from))
            .unwrap();
        (session, rx)
    }

    #[test]
    fn connect_assigns_distinct_ids() {
        let registry = ConnectionRegistry::new(16);
        let (a, _rx_a) = channel_session(&registry, None);
        let (b, _rx_b) = channel_session(&registry, None);
        assert_ne!(a.id, b.id);
        assert_ne!(a.client_id, b.client_id);
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn connect_uses_supplied_client_id() {
        let registry = ConnectionRegistry::new(16);
        let (session, _rx) = channel_session(&registry, Some("extension-1"));
        assert_eq!(session.client_id.as_str(), "extension-1");
    }

    #[test]
    fn fallback_ids_do_not_repeat_after_churn() {
        let registry = ConnectionRegistry::new(16);
        let (first, _rx1) = channel_session(&registry, None);
        let _ = registry.disconnect(first.id);
        let (second, _rx2) = channel_session(&registry, None);
        assert_ne!(first.client_id, second.client_id);
    }

    #[test]
    fn connect_sets_both_timestamps() {
        let registry = ConnectionRegistry::new(16);
        let (session, _rx) = channel_session(&registry, None);
        assert_eq!(session.connected_at, session.last_activity());
    }

    #[test]
    fn connect_beyond_limit_is_rejected() {
        let registry = ConnectionRegistry::new(1);
        let (_s, _rx) = channel_session(&registry, None);
        let (sink, _rx2) = ChannelSink::channel(1);
        let result = registry.connect(Arc::new(sink), None);
        assert_matches!(result, Err(RegistryError::AtCapacity { limit: 1 }));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn session_debug_omits_transport() {
        let registry = ConnectionRegistry::new(16);
        let (session, _rx) = channel_session(&registry, Some("dbg"));
        let rendered = format!("{session:?}");
        assert!(rendered.starts_with("Session"));
        assert!(rendered.contains("dbg"));
        assert!(!rendered.contains("sink"));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let registry = ConnectionRegistry::new(16);
        let (session, _rx) = channel_session(&registry, None);
        let (_other, _rx2) = channel_session(&registry, None);
        assert!(registry.disconnect(session.id));
        assert_eq!(registry.active_count(), 1);
        assert!(!registry.disconnect(session.id));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn disconnect_unknown_is_noop() {
        let registry = ConnectionRegistry::new(16);
        let (_s, _rx) = channel_session(&registry, None);
        assert!(!registry.disconnect(ConnectionId::new(999)));
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn send_to_delivers_and_touches() {
        let registry = ConnectionRegistry::new(16);
        let (session, mut rx) = channel_session(&registry, None);
        let before = session.last_activity();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        assert!(registry.send_to(session.id, "hello").await);
        assert_eq!(rx.recv().await.unwrap(), "hello");
        assert!(session.last_activity() > before);
        assert_eq!(session.connected_at, before);
    }

    #[tokio::test]
    async fn send_failure_evicts() {
        let registry = ConnectionRegistry::new(16);
        let session = registry.connect(Arc::new(BrokenSink), None).unwrap();
        assert!(!registry.send_to(session.id, "hello").await);
        assert_eq!(registry.active_count(), 0);
        assert!(registry.get(session.id).is_none());
    }

    #[tokio::test]
    async fn send_to_unknown_returns_false() {
        let registry = ConnectionRegistry::new(16);
        assert!(!registry.send_to(ConnectionId::new(42), "hello").await);
    }

    #[tokio::test]
    async fn send_envelope_serializes() {
        let registry = ConnectionRegistry::new(16);
        let (session, mut rx) = channel_session(&registry, None);
        assert!(registry.send_envelope(session.id, &Outbound::pong()).await);
        let parsed: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(parsed["type"], "pong");
    }

    #[tokio::test]
    async fn broadcast_evicts_only_broken_sessions() {
        let registry = ConnectionRegistry::new(16);
        let (a, mut rx_a) = channel_session(&registry, None);
        let broken = registry.connect(Arc::new(BrokenSink), None).unwrap();
        let (c, mut rx_c) = channel_session(&registry, None);
        assert_eq!(registry.active_count(), 3);

        let report = registry.broadcast("announcement").await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.evicted, vec![broken.id]);
        assert_eq!(registry.active_count(), 2);
        assert_eq!(rx_a.recv().await.unwrap(), "announcement");
        assert_eq!(rx_c.recv().await.unwrap(), "announcement");
        assert!(registry.get(a.id).is_some());
        assert!(registry.get(c.id).is_some());
    }

    #[tokio::test]
    async fn broadcast_counts_dropped_receiver_as_broken() {
        let registry = ConnectionRegistry::new(16);
        let (_a, rx_a) = channel_session(&registry, None);
        let (_b, mut rx_b) = channel_session(&registry, None);
        drop(rx_a);

        let report = registry.broadcast("x").await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted.len(), 1);
        assert_eq!(rx_b.recv().await.unwrap(), "x");
    }

    #[tokio::test]
    async fn broadcast_to_empty_registry() {
        let registry = ConnectionRegistry::new(16);
        let report = registry.broadcast("nobody").await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn broadcast_envelope_reaches_all() {
        let registry = ConnectionRegistry::new(16);
        let (_a, mut rx_a) = channel_session(&registry, None);
        let (_b, mut rx_b) = channel_session(&registry, None);
        let report = registry.broadcast_envelope(&Outbound::pong()).await;
        assert_eq!(report.delivered, 2);
        assert!(rx_a.recv().await.unwrap().contains("\"pong\""));
        assert!(rx_b.recv().await.unwrap().contains("\"pong\""));
    }

    #[test]
    fn snapshot_in_admission_order() {
        let registry = ConnectionRegistry::new(16);
        let (_a, _rx_a) = channel_session(&registry, Some("first"));
        let (_b, _rx_b) = channel_session(&registry, Some("second"));
        let (_c, _rx_c) = channel_session(&registry, Some("third"));

        let names: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|s| s.client_id.to_string())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn snapshot_serializes_health_shape() {
        let registry = ConnectionRegistry::new(16);
        let (_a, _rx) = channel_session(&registry, Some("c1"));
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json[0]["client_id"], "c1");
        assert!(json[0]["connected_at"].is_string());
        assert!(json[0]["last_activity"].is_string());
    }

    #[test]
    fn active_count_tracks_connects_and_disconnects() {
        let registry = ConnectionRegistry::new(16);
        let mut held = Vec::new();
        for _ in 0..5 {
            held.push(channel_session(&registry, None));
        }
        assert_eq!(registry.active_count(), 5);
        for (session, _) in held.iter().take(2) {
            let _ = registry.disconnect(session.id);
        }
        assert_eq!(registry.active_count(), 3);
    }
}
