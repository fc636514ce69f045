use crate::types::{NotificationError, Result, message::OutboundFrame};
use crate::websocket::{CloseFrame, FrameSink};
use serde::Serialize;
use std::fmt;
use tokio::sync::{RwLock, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }

    /// An attempt is in flight or open; `connect()` is a no-op in these states
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write half of the current socket plus the published connection state
pub struct ConnectionManager {
    sink: RwLock<Option<Box<dyn FrameSink>>>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            sink: RwLock::new(None),
            state,
        }
    }

    /// Sets the write half (called after a successful open)
    pub async fn set_sink(&self, sink: Box<dyn FrameSink>) {
        *self.sink.write().await = Some(sink);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn set_state(&self, new_state: ConnectionState) {
        let previous = self.state.send_replace(new_state);
        if previous != new_state {
            tracing::debug!("Connection state {} -> {}", previous, new_state);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Serialises and sends one frame
    pub async fn send_frame(&self, frame: &OutboundFrame) -> Result<()> {
        let json = serde_json::to_string(frame)?;

        let mut sink = self.sink.write().await;
        match sink.as_mut() {
            Some(sink) => sink.send_text(json).await,
            None => Err(NotificationError::NotConnected),
        }
    }

    /// Sends a close frame and drops the write half
    pub async fn close(&self, frame: CloseFrame) -> Result<()> {
        let mut sink = self.sink.write().await;
        let result = match sink.as_mut() {
            Some(writer) => writer.close(frame).await,
            None => Ok(()),
        };
        *sink = None;
        result
    }

    /// Drops the write half without a close handshake
    pub async fn clear_sink(&self) {
        *self.sink.write().await = None;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
