//! Socket-agnostic transport seam.
//!
//! The client only ever talks to a [`Connector`] and the two halves it hands
//! back, so tests can drive the connection state machine with an in-memory
//! transport.

use crate::types::Result;
use crate::types::constants::{
    WS_CLOSE_ABNORMAL, WS_CLOSE_NORMAL, WS_CLOSE_POLICY_VIOLATION, WS_CLOSE_SERVER_ERROR,
    WS_CLOSE_UNSUPPORTED_DATA,
};
use async_trait::async_trait;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(WS_CLOSE_NORMAL, reason)
    }

    /// Local stand-in for a connection that died without a close handshake
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(WS_CLOSE_ABNORMAL, reason)
    }

    pub fn kind(&self) -> CloseKind {
        CloseKind::from_code(self.code)
    }
}

/// How a close code is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// 1000, explicit disconnect
    Normal,
    /// 1006, connection dropped
    Abnormal,
    /// 1008 / 1003, credential rejected
    AuthRejected,
    /// 1011
    ServerError,
    Other(u16),
}

impl CloseKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            WS_CLOSE_NORMAL => Self::Normal,
            WS_CLOSE_ABNORMAL => Self::Abnormal,
            WS_CLOSE_POLICY_VIOLATION | WS_CLOSE_UNSUPPORTED_DATA => Self::AuthRejected,
            WS_CLOSE_SERVER_ERROR => Self::ServerError,
            other => Self::Other(other),
        }
    }

    pub fn should_reconnect(self) -> bool {
        !matches!(self, Self::Normal | Self::AuthRejected)
    }
}

/// Something the read half observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Closed(CloseFrame),
}

/// Write half of a socket
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send_text(&mut self, text: String) -> Result<()>;

    async fn close(&mut self, frame: CloseFrame) -> Result<()>;
}

/// Read half of a socket. `None` means the stream ended without a close frame.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

pub struct TransportSocket {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

/// Opens sockets. Handshake rejections of the credential surface as
/// [`NotificationError::Auth`](crate::NotificationError::Auth).
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<TransportSocket>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_classification() {
        assert_eq!(CloseKind::from_code(1000), CloseKind::Normal);
        assert_eq!(CloseKind::from_code(1006), CloseKind::Abnormal);
        assert_eq!(CloseKind::from_code(1008), CloseKind::AuthRejected);
        assert_eq!(CloseKind::from_code(1003), CloseKind::AuthRejected);
        assert_eq!(CloseKind::from_code(1011), CloseKind::ServerError);
        assert_eq!(CloseKind::from_code(4001), CloseKind::Other(4001));
    }

    #[test]
    fn test_only_normal_and_auth_closes_are_terminal() {
        assert!(!CloseKind::Normal.should_reconnect());
        assert!(!CloseKind::AuthRejected.should_reconnect());
        assert!(CloseKind::Abnormal.should_reconnect());
        assert!(CloseKind::ServerError.should_reconnect());
        assert!(CloseKind::Other(1001).should_reconnect());
    }
}
