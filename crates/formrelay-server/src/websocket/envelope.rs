//! Wire envelopes.
//!
//! Every frame is a flat JSON object whose `type` field selects the schema.
//! [`Inbound`] is decoded leniently from a parsed [`Value`] so that an
//! unrecognised or missing `type` becomes [`Inbound::Unknown`] rather than a
//! decode failure. [`Outbound`] is a tagged enum serialized with serde.

use formrelay_catalog::{DEFAULT_SEQUENCE_TYPE, SequenceDocument};
use formrelay_core::time;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{DispatchError, json_type_name};

/// Error message for frames that are not valid JSON.
pub const INVALID_JSON: &str = "Invalid JSON format";

/// Welcome text sent on admission.
pub const WELCOME_MESSAGE: &str = "Connected to Form Automation Relay WebSocket API";

/// A decoded client request.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// Request a sequence document from the catalog.
    GetAutomationSequence {
        /// Catalog key.
        sequence_type: String,
        /// Caller parameters, forwarded to the catalog.
        parameters: Map<String, Value>,
    },
    /// Liveness check.
    Ping,
    /// Progress report from the client; echoed back.
    AutomationStatus {
        /// Passed through verbatim.
        status: Value,
        /// Passed through verbatim.
        sequence_id: Value,
    },
    /// Any other `type`, including a missing one (`Value::Null`).
    Unknown {
        /// The raw `type` value.
        message_type: Value,
    },
}

impl Inbound {
    /// Wire name of the request, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetAutomationSequence { .. } => "get_automation_sequence",
            Self::Ping => "ping",
            Self::AutomationStatus { .. } => "automation_status",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Decode a parsed frame.
    ///
    /// Non-object JSON and objects without `type` decode as
    /// [`Inbound::Unknown`] with a null type. A non-string `sequence_type`
    /// returns [`DispatchError`]; a non-object `parameters` is treated as
    /// absent.
    pub fn from_value(value: Value) -> Result<Self, DispatchError> {
        // An envelope must be an object; anything else carries no `type`.
        let Value::Object(mut fields) = value else {
            return Ok(Self::Unknown {
                message_type: Value::Null,
            });
        };

        let message_type = fields.remove("type").unwrap_or(Value::Null);
        match message_type.as_str() {
            Some("get_automation_sequence") => {
                let sequence_type = match fields.remove("sequence_type") {
                    None | Some(Value::Null) => DEFAULT_SEQUENCE_TYPE.to_owned(),
                    Some(Value::String(s)) => s,
                    Some(other) => {
                        return Err(DispatchError::InvalidField {
                            field: "sequence_type",
                            expected: "a string",
                            actual: json_type_name(&other),
                        });
                    }
                };
                let parameters = match fields.remove("parameters") {
                    Some(Value::Object(map)) => map,
                    None | Some(Value::Null) => Map::new(),
                    Some(other) => {
                        debug!(actual = json_type_name(&other), "non-object parameters ignored");
                        Map::new()
                    }
                };
                Ok(Self::GetAutomationSequence {
                    sequence_type,
                    parameters,
                })
            }
            Some("ping") => Ok(Self::Ping),
            Some("automation_status") => Ok(Self::AutomationStatus {
                status: fields.remove("status").unwrap_or(Value::Null),
                sequence_id: fields.remove("sequence_id").unwrap_or(Value::Null),
            }),
            _ => Ok(Self::Unknown { message_type }),
        }
    }
}

/// A server response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Sent once after admission.
    ConnectionEstablished {
        /// Greeting text.
        message: String,
        /// The session's client label.
        client_id: String,
        /// RFC 3339.
        timestamp: String,
    },
    /// Answer to `get_automation_sequence`.
    AutomationSequenceResponse {
        /// The resolved document.
        sequence: SequenceDocument,
        /// RFC 3339.
        timestamp: String,
    },
    /// Answer to `ping`.
    Pong {
        /// RFC 3339.
        timestamp: String,
    },
    /// Answer to `automation_status`.
    StatusAcknowledged {
        /// Echoed verbatim, `null` when absent.
        sequence_id: Value,
        /// Echoed verbatim, `null` when absent.
        status: Value,
        /// RFC 3339.
        timestamp: String,
    },
    /// Any failure.
    Error {
        /// Human-readable description.
        message: String,
        /// RFC 3339.
        timestamp: String,
    },
}

impl Outbound {
    /// Welcome envelope for a freshly admitted session.
    pub fn welcome(client_id: &str) -> Self {
        Self::ConnectionEstablished {
            message: WELCOME_MESSAGE.to_owned(),
            client_id: client_id.to_owned(),
            timestamp: time::now_wire(),
        }
    }

    /// Sequence response.
    pub fn sequence(sequence: SequenceDocument) -> Self {
        Self::AutomationSequenceResponse {
            sequence,
            timestamp: time::now_wire(),
        }
    }

    /// Pong stamped with the current time.
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: time::now_wire(),
        }
    }

    /// Status acknowledgement.
    pub fn status_acknowledged(sequence_id: Value, status: Value) -> Self {
        Self::StatusAcknowledged {
            sequence_id,
            status,
            timestamp: time::now_wire(),
        }
    }

    /// Error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: time::now_wire(),
        }
    }

    /// Error for an undecodable frame.
    pub fn invalid_json() -> Self {
        Self::error(INVALID_JSON)
    }

    /// Error naming an unrecognised `type` value.
    pub fn unknown_type(message_type: &Value) -> Self {
        Self::error(format!("Unknown message type: {}", render_type(message_type)))
    }

    /// Error for a handler fault.
    pub fn server_error(err: &DispatchError) -> Self {
        Self::error(format!("Server error: {err}"))
    }
}

// Strings are shown bare, everything else as JSON text.
fn render_type(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
