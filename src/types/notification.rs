use crate::types::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Visual severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Danger,
    #[default]
    #[serde(other)]
    Info,
}

/// What happens when the user activates a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Navigate to a path or URL, `params` become query parameters
    Navigate,
    /// Open a named modal component with `params`
    Modal,
    /// Invoke a named, globally registered client function with `params`
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub target: String,
    #[serde(default)]
    pub params: Value,
}

impl NotificationAction {
    pub fn new(kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            params: Value::Null,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// A single entry of the notification feed.
///
/// `id` is the server identifier rendered as a string; it is stable across
/// reconnects and is the deduplication key of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "message", default)]
    pub body: String,
    #[serde(rename = "type", default)]
    pub severity: Severity,
    /// Does not auto-dismiss
    #[serde(default)]
    pub sticky: bool,
    /// Display duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<NotificationAction>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
}

impl Notification {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            severity: Severity::Info,
            sticky: false,
            duration: None,
            action: None,
            read: false,
            created_at: None,
            expires_at: None,
            user_id: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

/// Server identifiers arrive as integers over REST and as strings over the socket.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_socket_notification() {
        let value = json!({
            "id": "42",
            "title": "Trip completed",
            "message": "Vehicle 7 returned",
            "type": "success",
            "user_id": 3,
            "action": {"type": "navigate", "target": "/trips/9", "params": {"tab": "log"}},
            "created_at": "2024-05-01T09:30:00.123456",
            "read": false
        });

        let notification: Notification = serde_json::from_value(value).unwrap();
        assert_eq!(notification.id, "42");
        assert_eq!(notification.body, "Vehicle 7 returned");
        assert_eq!(notification.severity, Severity::Success);
        assert_eq!(notification.user_id.as_deref(), Some("3"));
        assert!(notification.created_at.is_some());

        let action = notification.action.unwrap();
        assert_eq!(action.kind, ActionKind::Navigate);
        assert_eq!(action.target, "/trips/9");
        assert_eq!(action.params["tab"], "log");
    }

    #[test]
    fn test_integer_id_and_null_action() {
        let notification: Notification =
            serde_json::from_value(json!({"id": 7, "title": "t", "action": null})).unwrap();
        assert_eq!(notification.id, "7");
        assert!(notification.action.is_none());
        assert!(!notification.read);
    }

    #[test]
    fn test_unknown_severity_falls_back_to_info() {
        let notification: Notification =
            serde_json::from_value(json!({"id": "1", "type": "critical"})).unwrap();
        assert_eq!(notification.severity, Severity::Info);
    }

    #[test]
    fn test_action_without_params() {
        let action: NotificationAction =
            serde_json::from_value(json!({"type": "modal", "target": "TripDetails"})).unwrap();
        assert_eq!(action.kind, ActionKind::Modal);
        assert_eq!(action.params, Value::Null);
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let notification = Notification::new("1", "t", "b");
        assert!(!notification.is_expired(now));
        assert!(notification
            .with_expires_at(now - chrono::Duration::seconds(1))
            .is_expired(now));
    }
}
