//! `RelayServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use formrelay_catalog::SequenceCatalog;
use formrelay_core::constants::{HEALTH_PATH, WS_PATH};
use formrelay_core::ids::ClientId;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse, RootResponse};
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::{RelayContext, serve_socket};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Context handed to every session task.
    pub relay: Arc<RelayContext>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Tracker every upgraded session runs under.
    pub sessions: TaskTracker,
}

/// Query string accepted on `/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Caller-chosen client label. Empty counts as absent.
    pub client_id: Option<ClientId>,
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    catalog: Arc<dyn SequenceCatalog>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
}

impl RelayServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, catalog: Arc<dyn SequenceCatalog>) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(config.max_connections)),
            config,
            catalog,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            relay: Arc::new(RelayContext {
                registry: self.registry.clone(),
                catalog: self.catalog.clone(),
                heartbeat_interval: self.config.heartbeat_interval(),
                heartbeat_timeout: self.config.heartbeat_timeout(),
                shutdown: self.shutdown.token(),
            }),
            metrics: self.metrics.clone(),
            max_message_size: self.config.max_message_size,
            sessions: self.shutdown.sessions(),
        };

        Router::new()
            .route("/", get(root_handler))
            .route(HEALTH_PATH, get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route(WS_PATH, get(ws_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve in a background task.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    /// Pass the task to [`ShutdownCoordinator::drain`] to stop the listener
    /// and wait for the WebSocket sessions.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });
        info!(%addr, "relay listening");
        Ok((addr, handle))
    }

    /// Live session table.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /
async fn root_handler(State(state): State<AppState>) -> Json<RootResponse> {
    Json(health::root(&state.relay.registry))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(&state.relay.registry))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// GET /ws
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let client_id = query.client_id.filter(|id| !id.as_str().is_empty());
    let relay = state.relay.clone();
    let sessions = state.sessions.clone();

    ws.max_message_size(state.max_message_size)
        .on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| sessions.track_future(serve_socket(socket, client_id, relay)))
}
