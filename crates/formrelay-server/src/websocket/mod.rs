//! WebSocket connection registry, envelope types, dispatch, heartbeat, and
//! the per-connection session loop.

pub mod envelope;
pub mod handler;
pub mod heartbeat;
pub mod registry;
pub mod session;
pub mod transport;
