//! Envelope dispatch: parse one inbound frame and produce its single reply.

use std::panic::{AssertUnwindSafe, catch_unwind};

use formrelay_catalog::SequenceCatalog;
use metrics::counter;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use super::envelope::{Inbound, Outbound};
use crate::errors::DispatchError;
use crate::metrics::WS_MESSAGES_TOTAL;

/// Result of handling one inbound frame.
#[derive(Debug)]
pub struct HandleResult {
    /// The reply to send back.
    pub response: Outbound,
    /// Request kind (`"invalid"` if the frame did not parse).
    pub kind: &'static str,
}

/// Handle one inbound text frame.
///
/// Always yields exactly one reply, never fails.
#[instrument(skip_all, fields(message_type))]
pub fn handle_message(text: &str, catalog: &dyn SequenceCatalog) -> HandleResult {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "invalid JSON received");
            counter!(WS_MESSAGES_TOTAL, "type" => "invalid").increment(1);
            return HandleResult {
                response: Outbound::invalid_json(),
                kind: "invalid",
            };
        }
    };

    let (kind, response) = match Inbound::from_value(value) {
        Ok(inbound) => {
            let kind = inbound.kind();
            (kind, dispatch(inbound, catalog))
        }
        Err(e) => {
            error!(error = %e, "malformed request");
            ("malformed", Outbound::server_error(&e))
        }
    };
    let _ = tracing::Span::current().record("message_type", kind);
    counter!(WS_MESSAGES_TOTAL, "type" => kind).increment(1);
    HandleResult { response, kind }
}

/// Route a decoded request to its handler.
pub fn dispatch(inbound: Inbound, catalog: &dyn SequenceCatalog) -> Outbound {
    match inbound {
        Inbound::GetAutomationSequence {
            sequence_type,
            parameters,
        } => {
            info!(sequence_type, "automation sequence requested");
            match resolve_guarded(catalog, &sequence_type, &parameters) {
                Ok(sequence) => {
                    debug!(
                        sequence_id = %sequence.sequence_id,
                        steps = sequence.steps.len(),
                        total_delay_ms = sequence.total_delay_ms(),
                        "serving sequence"
                    );
                    Outbound::sequence(sequence)
                }
                Err(e) => {
                    error!(sequence_type, error = %e, "failed to resolve sequence");
                    Outbound::server_error(&e)
                }
            }
        }
        Inbound::Ping => {
            debug!("ping");
            Outbound::pong()
        }
        Inbound::AutomationStatus {
            status,
            sequence_id,
        } => {
            info!(%sequence_id, %status, "automation status update");
            Outbound::status_acknowledged(sequence_id, status)
        }
        Inbound::Unknown { message_type } => {
            warn!(%message_type, "unknown message type");
            Outbound::unknown_type(&message_type)
        }
    }
}

// A catalog panic must not take the connection task down with it.
fn resolve_guarded(
    catalog: &dyn SequenceCatalog,
    sequence_type: &str,
    parameters: &Map<String, Value>,
) -> Result<formrelay_catalog::SequenceDocument, DispatchError> {
    catch_unwind(AssertUnwindSafe(|| catalog.resolve(sequence_type, parameters))).map_err(
        |payload| {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            DispatchError::Catalog(detail)
        },
    )
}
