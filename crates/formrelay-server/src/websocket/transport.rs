//! Outbound transport abstraction.
//!
//! The registry owns one [`MessageSink`] per session and only ever talks to
//! the client through it. [`WsSink`] writes to a real socket;
//! [`ChannelSink`] hands frames to an in-process receiver.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use tokio::sync::{Mutex, mpsc};

use crate::errors::TransportError;

/// Write half of a client connection.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Write one text frame. Completes once the frame is handed to the socket.
    async fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Write a transport-level ping. No-op for sinks without a ping notion.
    async fn send_ping(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Close the transport. Errors are ignored.
    async fn close(&self);
}

/// Sink over the write half of an axum `WebSocket`.
pub struct WsSink {
    inner: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSink {
    /// Wrap a split write half.
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.inner
            .lock()
            .await
            .send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn send_ping(&self) -> Result<(), TransportError> {
        self.inner
            .lock()
            .await
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.inner.lock().await.close().await;
    }
}

/// Sink that forwards frames into an mpsc channel.
///
/// Sending fails with [`TransportError::Closed`] once the receiver is dropped.
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes its frames.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(text.to_owned())
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) {}
}
