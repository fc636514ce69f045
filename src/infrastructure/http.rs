use crate::types::notification::{ActionKind, Notification, NotificationAction, Severity};
use crate::types::{NotificationError, Result, timestamp};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Query for the recent-notifications endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchQuery {
    pub limit: u32,
    pub unread_only: bool,
}

/// One page of the recent-notifications endpoint, newest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: u64,
    pub unread_count: u64,
}

/// REST collaborator for initial load, resync and read-state mutation
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn fetch_recent(&self, token: &str, query: FetchQuery) -> Result<NotificationPage>;

    async fn mark_read(&self, token: &str, id: &str) -> Result<()>;

    /// Returns how many notifications the server changed
    async fn mark_all_read(&self, token: &str) -> Result<u64>;
}

/// Notification as returned by the REST API
#[derive(Debug, Deserialize)]
struct ApiNotification {
    id: i64,
    title: String,
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    severity: Severity,
    #[serde(default)]
    read: bool,
    action_type: Option<ActionKind>,
    action_target: Option<String>,
    #[serde(default)]
    action_params: Value,
    created_at: Option<String>,
    expires_at: Option<String>,
}

impl From<ApiNotification> for Notification {
    fn from(api: ApiNotification) -> Self {
        let action = api.action_type.map(|kind| NotificationAction {
            kind,
            target: api.action_target.unwrap_or_default(),
            params: api.action_params,
        });

        Notification {
            id: api.id.to_string(),
            title: api.title,
            body: api.message,
            severity: api.severity,
            sticky: false,
            duration: None,
            action,
            read: api.read,
            created_at: api.created_at.as_deref().and_then(timestamp::parse),
            expires_at: api.expires_at.as_deref().and_then(timestamp::parse),
            user_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiNotificationList {
    notifications: Vec<ApiNotification>,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    unread_count: u64,
}

#[derive(Debug, Deserialize)]
struct MarkAllReadResponse {
    #[serde(default)]
    marked_count: u64,
}

/// reqwest implementation of [`NotificationApi`]
pub struct HttpNotificationApi {
    base_endpoint: String,
    http_client: reqwest::Client,
}

impl HttpNotificationApi {
    /// `base_endpoint` is the API prefix, e.g. `https://host/api/v1`
    pub fn new(base_endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_endpoint: base_endpoint.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_endpoint, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(NotificationError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotificationError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn fetch_recent(&self, token: &str, query: FetchQuery) -> Result<NotificationPage> {
        let response = self
            .http_client
            .get(self.url("/notifications"))
            .bearer_auth(token)
            .query(&[
                ("limit", query.limit.to_string()),
                ("unread_only", query.unread_only.to_string()),
            ])
            .send()
            .await?;

        let list: ApiNotificationList = Self::check(response).await?.json().await?;
        tracing::debug!("Fetched {} notifications", list.notifications.len());

        Ok(NotificationPage {
            notifications: list.notifications.into_iter().map(Notification::from).collect(),
            total: list.total,
            unread_count: list.unread_count,
        })
    }

    async fn mark_read(&self, token: &str, id: &str) -> Result<()> {
        let response = self
            .http_client
            .post(self.url(&format!("/notifications/{}/read", id)))
            .bearer_auth(token)
            .send()
            .await?;

        Self::check(response).await?;
        tracing::debug!("Marked notification {} read", id);
        Ok(())
    }

    async fn mark_all_read(&self, token: &str) -> Result<u64> {
        let response = self
            .http_client
            .post(self.url("/notifications/read-all"))
            .bearer_auth(token)
            .send()
            .await?;

        let body: MarkAllReadResponse = Self::check(response).await?.json().await?;
        tracing::debug!("Marked {} notifications read", body.marked_count);
        Ok(body.marked_count)
    }
}

/// Derives the REST base (`http(s)://host[:port]/api/v1`) from a WebSocket endpoint
pub fn ws_to_http_endpoint(ws_endpoint: &Url, api_prefix: &str) -> Result<Url> {
    let mut url = ws_endpoint.clone();
    let scheme = match url.scheme() {
        "wss" | "https" => "https",
        _ => "http",
    };
    url.set_scheme(scheme)
        .map_err(|()| NotificationError::Config(format!("cannot derive http endpoint from {}", ws_endpoint)))?;
    url.set_path(api_prefix);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpNotificationApi {
        HttpNotificationApi::new(format!("{}/api/v1/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_ws_to_http_endpoint() {
        let ws = Url::parse("wss://fleet.example.com/api/v1/ws/notifications?token=abc").unwrap();
        let http = ws_to_http_endpoint(&ws, "/api/v1").unwrap();
        assert_eq!(http.as_str(), "https://fleet.example.com/api/v1");

        let ws = Url::parse("ws://localhost:8000/api/v1/ws/notifications").unwrap();
        let http = ws_to_http_endpoint(&ws, "/api/v1").unwrap();
        assert_eq!(http.as_str(), "http://localhost:8000/api/v1");
    }

    #[tokio::test]
    async fn test_fetch_recent_maps_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/notifications"))
            .and(query_param("limit", "50"))
            .and(query_param("unread_only", "false"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notifications": [
                    {
                        "id": 12,
                        "title": "Maintenance due",
                        "message": "Truck 4 needs service",
                        "type": "warning",
                        "read": false,
                        "action_type": "navigate",
                        "action_target": "/fleet/vehicles/4",
                        "action_params": {"tab": "maintenance"},
                        "created_at": "2024-05-01T10:00:00.5",
                        "expires_at": null
                    },
                    {
                        "id": 11,
                        "title": "Welcome",
                        "message": "",
                        "type": "info",
                        "read": true,
                        "created_at": "2024-04-30T08:00:00"
                    }
                ],
                "total": 2,
                "unread_count": 1
            })))
            .mount(&server)
            .await;

        let page = api(&server)
            .fetch_recent(
                "tok",
                FetchQuery {
                    limit: 50,
                    unread_only: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.unread_count, 1);
        assert_eq!(page.notifications[0].id, "12");
        assert_eq!(page.notifications[0].severity, Severity::Warning);
        let action = page.notifications[0].action.as_ref().unwrap();
        assert_eq!(action.kind, ActionKind::Navigate);
        assert_eq!(action.params["tab"], "maintenance");
        assert!(page.notifications[1].read);
        assert!(page.notifications[1].action.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications/3/read"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = api(&server).mark_read("tok", "3").await.unwrap_err();
        assert!(matches!(err, NotificationError::Unauthorized));
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_server_error_is_recoverable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications/read-all"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .mount(&server)
            .await;

        let err = api(&server).mark_all_read("tok").await.unwrap_err();
        match err {
            NotificationError::Api { status, ref message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "db down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_mark_all_read_returns_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications/read-all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Marked 4 notifications as read",
                "marked_count": 4
            })))
            .mount(&server)
            .await;

        assert_eq!(api(&server).mark_all_read("tok").await.unwrap(), 4);
    }
}
