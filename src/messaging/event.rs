use crate::types::constants::{frame_types, notification_events};
use crate::types::notification::{Notification, deserialize_id, deserialize_optional_id};
use serde::Deserialize;

/// Type-safe frame types
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FrameType {
    /// A notification was created (or its read flag changed)
    Notification,

    /// One notification was marked read elsewhere
    NotificationRead,

    /// Every notification of the user was marked read elsewhere
    NotificationsReadAll,

    /// Server-initiated heartbeat, also the outbound probe type
    Heartbeat,

    /// Reply to our probe
    HeartbeatResponse,

    /// Sent by the server once the socket is registered
    ConnectionEstablished,

    /// Non-fatal server-side error report
    Error,

    /// Anything else, ignored for forward compatibility
    Unknown(String),
}

impl FrameType {
    /// Parse a string into a FrameType
    pub fn from_str(s: &str) -> Self {
        match s {
            frame_types::NOTIFICATION => Self::Notification,
            frame_types::NOTIFICATION_READ => Self::NotificationRead,
            frame_types::NOTIFICATIONS_READ_ALL => Self::NotificationsReadAll,
            frame_types::HEARTBEAT => Self::Heartbeat,
            frame_types::HEARTBEAT_RESPONSE => Self::HeartbeatResponse,
            frame_types::CONNECTION_ESTABLISHED => Self::ConnectionEstablished,
            frame_types::ERROR => Self::Error,
            _ => Self::Unknown(s.to_string()),
        }
    }

    /// Convert frame type to string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Notification => frame_types::NOTIFICATION,
            Self::NotificationRead => frame_types::NOTIFICATION_READ,
            Self::NotificationsReadAll => frame_types::NOTIFICATIONS_READ_ALL,
            Self::Heartbeat => frame_types::HEARTBEAT,
            Self::HeartbeatResponse => frame_types::HEARTBEAT_RESPONSE,
            Self::ConnectionEstablished => frame_types::CONNECTION_ESTABLISHED,
            Self::Error => frame_types::ERROR,
            Self::Unknown(s) => s,
        }
    }

    /// Frames that prove the connection is alive
    pub fn is_liveness(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat | Self::HeartbeatResponse | Self::ConnectionEstablished
        )
    }
}

impl From<&str> for FrameType {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for FrameType {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<FrameType> for String {
    fn from(frame_type: FrameType) -> Self {
        frame_type.as_str().to_string()
    }
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `data.action` of a notification frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationEvent {
    #[default]
    New,
    Read,
}

impl<'de> Deserialize<'de> for NotificationEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            notification_events::READ => Self::Read,
            notification_events::NEW => Self::New,
            other => {
                tracing::debug!("Unknown notification event '{}', treating as new", other);
                Self::New
            }
        })
    }
}

/// `data` of a `notification` frame
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub action: NotificationEvent,
    pub notification: Notification,
}

/// `data` of a `notification_read` frame
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationReadPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub notification_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub user_id: Option<String>,
}

/// `data` of an `error` frame
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
}
