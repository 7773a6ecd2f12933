//! Wire timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as RFC 3339 with microsecond precision.
pub fn to_wire(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current UTC time formatted for the wire.
pub fn now_wire() -> String {
    to_wire(&now())
}
