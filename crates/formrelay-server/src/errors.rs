//! Error types for the registry, transport, and dispatcher.

use thiserror::Error;

/// Admission failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The connection bound was reached; the connection was not registered.
    #[error("connection limit reached ({limit} active)")]
    AtCapacity {
        /// Configured maximum.
        limit: usize,
    },
}

/// Failures writing to a client transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer or the writer side has gone away.
    #[error("connection closed")]
    Closed,
    /// The underlying socket rejected the frame.
    #[error("send failed: {0}")]
    Send(String),
}

/// Faults while handling a recognised envelope.
///
/// Rendered to the client as `"Server error: <display>"`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A field is present but has the wrong JSON type.
    #[error("field '{field}' must be {expected}, got {actual}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Expected JSON type.
        expected: &'static str,
        /// Actual JSON type.
        actual: &'static str,
    },
    /// The sequence catalog failed while resolving.
    #[error("sequence catalog failed: {0}")]
    Catalog(String),
}

/// JSON type name used in [`DispatchError::InvalidField`].
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
