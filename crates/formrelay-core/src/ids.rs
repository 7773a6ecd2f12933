//! Connection and client identifiers.
//!
//! A live session is keyed by a [`ConnectionId`], a process-unique integer
//! handed out by the registry. The [`ClientId`] is the label reported to
//! operators; it is either supplied by the client or derived from the
//! connection sequence number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key of one admitted connection.
///
/// Allocated from a monotonically increasing counter and never reused within
/// a process, so a stale id can never alias a newer session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw sequence number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Client label attached to a session.
///
/// Deserialized straight from the `client_id` query parameter and serialized
/// as a bare string in health reports.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Fallback label for a connection that did not supply one.
    #[must_use]
    pub fn fallback(id: ConnectionId) -> Self {
        Self(format!("client_{}", id.get()))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
