//! Shutdown coordination for the listener and the WebSocket session tasks.
//!
//! `axum::serve` stops accepting and waits for HTTP connections, but an
//! upgraded socket runs in its own task that the server no longer tracks.
//! Sessions are therefore spawned through [`ShutdownCoordinator::sessions`]
//! so a drain can wait for every one of them to evict itself.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Drain window used when the caller does not pass one.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The listener and every session finished in time.
    Complete,
    /// The window elapsed with work still running.
    TimedOut {
        /// Sessions still running when the window elapsed.
        sessions_remaining: usize,
    },
}

/// Owns the shutdown signal and the set of live session tasks.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    sessions: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a coordinator with no tracked sessions.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }

    /// Token observed by the listener and every session loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Tracker that session futures are registered with.
    pub fn sessions(&self) -> TaskTracker {
        self.sessions.clone()
    }

    /// Session tasks currently running.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Signal shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown, then wait for the serve task and all sessions.
    pub async fn drain(&self, server: JoinHandle<()>, timeout: Option<Duration>) -> DrainOutcome {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);

        self.shutdown();
        let _ = self.sessions.close();
        info!(
            sessions = self.sessions.len(),
            timeout_secs = timeout.as_secs(),
            "draining listener and sessions"
        );

        let sessions = self.sessions.clone();
        let all = async move {
            let _ = server.await;
            sessions.wait().await;
        };
        if tokio::time::timeout(timeout, all).await.is_ok() {
            info!("drain complete");
            DrainOutcome::Complete
        } else {
            let sessions_remaining = self.sessions.len();
            warn!(sessions_remaining, "drain timed out after {timeout:?}");
            DrainOutcome::TimedOut { sessions_remaining }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
