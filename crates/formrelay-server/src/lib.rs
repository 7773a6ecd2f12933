//! # formrelay-server
//!
//! Axum HTTP + `WebSocket` relay.
//!
//! - `WebSocket` gateway: connection registry, heartbeat, envelope dispatch
//! - HTTP endpoints: service banner, health with per-connection details, metrics
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;
