//! Heartbeat ping/pong liveness monitoring.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::transport::MessageSink;

/// Per-connection liveness state, fed by the receive loop.
#[derive(Debug)]
pub struct Liveness {
    alive: AtomicBool,
    last_seen: Mutex<Instant>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    /// Fresh state, alive as of now.
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    /// Record inbound traffic (any frame, including Pong).
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Whether anything arrived since the last check. Resets the flag.
    pub fn check_alive(&self) -> bool {
        self.alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last inbound frame.
    pub fn elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// Nothing heard from the client within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
    /// Writing a ping failed.
    TransportFailed,
}

/// Send a ping every `interval` until the client goes quiet for `timeout`.
///
/// The first ping goes out one full interval after start.
pub async fn run_heartbeat(
    liveness: Arc<Liveness>,
    sink: Arc<dyn MessageSink>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !liveness.check_alive() && liveness.elapsed() >= timeout {
                    return HeartbeatResult::TimedOut;
                }
                if sink.send_ping().await.is_err() {
                    return HeartbeatResult::TransportFailed;
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}
