//! WebSocket session lifecycle: handles a single connected client from
//! admission through eviction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use formrelay_catalog::SequenceCatalog;
use formrelay_core::ids::ClientId;
use futures::{Stream, StreamExt};
use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::envelope::Outbound;
use super::handler::handle_message;
use super::heartbeat::{HeartbeatResult, Liveness, run_heartbeat};
use super::registry::{ConnectionRegistry, Session};
use super::transport::{MessageSink, WsSink};
use crate::metrics::{WS_CONNECTION_DURATION_SECONDS, WS_MESSAGES_TOTAL};

/// Everything a session task needs, shared across connections.
pub struct RelayContext {
    /// Live session table.
    pub registry: Arc<ConnectionRegistry>,
    /// Sequence lookup.
    pub catalog: Arc<dyn SequenceCatalog>,
    /// Ping interval, `None` when the heartbeat is disabled.
    pub heartbeat_interval: Option<Duration>,
    /// Silence tolerated before a session is closed.
    pub heartbeat_timeout: Duration,
    /// Server-wide shutdown signal.
    pub shutdown: CancellationToken,
}

/// Admit an upgraded socket and run its session to completion.
pub async fn serve_socket(ws: WebSocket, client_id: Option<ClientId>, ctx: Arc<RelayContext>) {
    let (ws_tx, ws_rx) = ws.split();
    let sink: Arc<dyn MessageSink> = Arc::new(WsSink::new(ws_tx));

    if ctx.shutdown.is_cancelled() {
        debug!("rejecting connection during shutdown");
        sink.close().await;
        return;
    }

    let session = match ctx.registry.connect(sink.clone(), client_id) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "rejecting connection");
            sink.close().await;
            return;
        }
    };
    run_ws_session(session, ws_rx, ctx).await;
}

/// Run the receive loop for an admitted session.
///
/// 1. Sends the `connection_established` welcome
/// 2. Handles one inbound frame at a time, writing its reply before reading on
/// 3. Pings the client and closes it after prolonged silence
/// 4. Evicts the session on peer close, read error, write failure, or shutdown
#[instrument(skip_all, fields(client_id = %session.client_id, conn_id = %session.id))]
pub async fn run_ws_session<S>(session: Arc<Session>, mut inbound: S, ctx: Arc<RelayContext>)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let started = Instant::now();
    let id = session.id;
    let stop = ctx.shutdown.child_token();
    let liveness = Arc::new(Liveness::new());

    let heartbeat = ctx.heartbeat_interval.map(|interval| {
        let liveness = liveness.clone();
        let sink = session.sink().clone();
        let timeout = ctx.heartbeat_timeout;
        let stop = stop.clone();
        tokio::spawn(async move {
            match run_heartbeat(liveness, sink, interval, timeout, stop.clone()).await {
                HeartbeatResult::Cancelled => {}
                HeartbeatResult::TimedOut => {
                    warn!(timeout_secs = timeout.as_secs(), "client unresponsive, disconnecting");
                    stop.cancel();
                }
                HeartbeatResult::TransportFailed => {
                    debug!("ping write failed");
                    stop.cancel();
                }
            }
        })
    });

    if ctx
        .registry
        .send_envelope(id, &Outbound::welcome(session.client_id.as_str()))
        .await
    {
        loop {
            let frame = tokio::select! {
                biased;
                () = stop.cancelled() => break,
                frame = inbound.next() => frame,
            };

            let msg = match frame {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read error");
                    break;
                }
                None => break,
            };
            liveness.mark_alive();

            let response = match msg {
                Message::Text(text) => handle_message(text.as_str(), ctx.catalog.as_ref()).response,
                Message::Binary(data) => {
                    if let Ok(text) = std::str::from_utf8(&data) {
                        handle_message(text, ctx.catalog.as_ref()).response
                    } else {
                        info!(len = data.len(), "received non-UTF8 binary frame");
                        counter!(WS_MESSAGES_TOTAL, "type" => "invalid").increment(1);
                        Outbound::invalid_json()
                    }
                }
                Message::Close(_) => {
                    debug!("client sent close frame");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            if !ctx.registry.send_envelope(id, &response).await {
                break;
            }
        }
    }

    stop.cancel();
    if let Some(handle) = heartbeat {
        let _ = handle.await;
    }
    let _ = ctx.registry.disconnect(id);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    session.sink().close().await;
}
