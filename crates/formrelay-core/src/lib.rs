//! # formrelay-core
//!
//! Foundation types shared by every formrelay crate:
//!
//! - **IDs**: [`ids::ConnectionId`] (arena key for live sessions) and
//!   [`ids::ClientId`] (the human-facing client label)
//! - **Timestamps**: RFC 3339 helpers used on the wire and in health output
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;
pub mod time;
