#![allow(dead_code)]

use async_trait::async_trait;
use realtime_notifications::{
    CloseFrame, ConnectionState, Connector, EndpointStrategy, FetchQuery, FrameSink, FrameSource,
    NetworkPresence, Notification, NotificationApi, NotificationClient, NotificationClientOptions,
    NotificationError, NotificationPage, Result, TransportEvent, TransportSocket,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// What the next handshake does
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Accept,
    Fail,
    AuthReject,
    /// Accepts after the handshake stalls for the given time
    Slow(Duration),
}

/// Server side of one accepted in-memory socket
pub struct ServerHandle {
    pub events: mpsc::UnboundedSender<TransportEvent>,
    pub sent: mpsc::UnboundedReceiver<String>,
    pub closed: Arc<Mutex<Option<CloseFrame>>>,
}

impl ServerHandle {
    pub fn push(&self, frame: serde_json::Value) {
        self.events
            .send(TransportEvent::Text(frame.to_string()))
            .unwrap();
    }

    pub fn close(&self, code: u16, reason: &str) {
        self.events
            .send(TransportEvent::Closed(CloseFrame::new(code, reason)))
            .unwrap();
    }

    pub fn close_code(&self) -> Option<u16> {
        self.closed.lock().unwrap().as_ref().map(|frame| frame.code)
    }
}

struct FakeSink {
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<Mutex<Option<CloseFrame>>>,
}

#[async_trait]
impl FrameSink for FakeSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sent
            .send(text)
            .map_err(|_| NotificationError::Connection("peer gone".to_string()))
    }

    async fn close(&mut self, frame: CloseFrame) -> Result<()> {
        *self.closed.lock().unwrap() = Some(frame);
        Ok(())
    }
}

struct FakeSource(mpsc::UnboundedReceiver<TransportEvent>);

#[async_trait]
impl FrameSource for FakeSource {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.0.recv().await
    }
}

/// In-memory transport. Handshakes follow the queued outcomes and accept
/// once the queue is empty.
pub struct FakeConnector {
    outcomes: Mutex<VecDeque<Outcome>>,
    servers: mpsc::UnboundedSender<ServerHandle>,
    attempts: AtomicUsize,
    urls: Mutex<Vec<Url>>,
}

impl FakeConnector {
    pub fn new(outcomes: &[Outcome]) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerHandle>) {
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            servers,
            attempts: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        });
        (connector, rx)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<Url> {
        self.urls.lock().unwrap().last().cloned()
    }

    pub fn queue(&self, outcomes: &[Outcome]) {
        self.outcomes.lock().unwrap().extend(outcomes.iter().copied());
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &Url) -> Result<TransportSocket> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept);
        match outcome {
            Outcome::Fail => Err(NotificationError::Connection("connection refused".to_string())),
            Outcome::AuthReject => Err(NotificationError::Auth("HTTP 401".to_string())),
            Outcome::Slow(stall) => {
                tokio::time::sleep(stall).await;
                Ok(self.accept())
            }
            Outcome::Accept => Ok(self.accept()),
        }
    }
}

impl FakeConnector {
    fn accept(&self) -> TransportSocket {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(Mutex::new(None));
        let _ = self.servers.send(ServerHandle {
            events: events_tx,
            sent: sent_rx,
            closed: Arc::clone(&closed),
        });
        TransportSocket {
            sink: Box::new(FakeSink {
                sent: sent_tx,
                closed,
            }),
            source: Box::new(FakeSource(events_rx)),
        }
    }
}

/// In-memory REST collaborator
#[derive(Default)]
pub struct FakeApi {
    pub page: Mutex<Vec<Notification>>,
    pub fetch_failures: Mutex<VecDeque<NotificationError>>,
    pub mark_failures: Mutex<VecDeque<NotificationError>>,
    pub fetches: AtomicUsize,
    pub marked: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_page(page: Vec<Notification>) -> Arc<Self> {
        Arc::new(Self {
            page: Mutex::new(page),
            ..Default::default()
        })
    }

    pub fn set_page(&self, page: Vec<Notification>) {
        *self.page.lock().unwrap() = page;
    }

    pub fn fail_next_fetch(&self, error: NotificationError) {
        self.fetch_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_mark(&self, error: NotificationError) {
        self.mark_failures.lock().unwrap().push_back(error);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationApi for FakeApi {
    async fn fetch_recent(&self, _token: &str, query: FetchQuery) -> Result<NotificationPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.fetch_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let notifications: Vec<_> = self
            .page
            .lock()
            .unwrap()
            .iter()
            .take(query.limit as usize)
            .cloned()
            .collect();
        let unread_count = notifications.iter().filter(|n| !n.read).count() as u64;
        Ok(NotificationPage {
            total: notifications.len() as u64,
            unread_count,
            notifications,
        })
    }

    async fn mark_read(&self, _token: &str, id: &str) -> Result<()> {
        if let Some(e) = self.mark_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        self.marked.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn mark_all_read(&self, _token: &str) -> Result<u64> {
        if let Some(e) = self.mark_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let count = self.page.lock().unwrap().iter().filter(|n| !n.read).count();
        Ok(count as u64)
    }
}

/// Options for tests: no jitter, heartbeats far enough apart not to interfere
pub fn quiet_options() -> NotificationClientOptions {
    NotificationClientOptions {
        endpoint: EndpointStrategy::explicit("ws://localhost:8000"),
        heartbeat_interval: Some(3_600_000),
        reconnect_jitter: Some(0),
        ..Default::default()
    }
}

pub fn build_client(
    options: NotificationClientOptions,
    connector: Arc<FakeConnector>,
    api: Arc<FakeApi>,
    presence: NetworkPresence,
) -> NotificationClient {
    NotificationClient::builder(options)
        .with_connector(connector)
        .with_api(api)
        .with_presence(presence)
        .build()
        .unwrap()
}

pub async fn wait_for_state(client: &NotificationClient, target: ConnectionState) {
    let mut states = client.state_changes();
    tokio::time::timeout(Duration::from_secs(600), states.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", target))
        .unwrap();
}

/// Polls `check` until it holds, on the paused clock
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..1_000 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

pub fn notification(id: &str, minute: u32) -> Notification {
    use chrono::{TimeZone, Utc};
    Notification::new(id, format!("Notification {id}"), "body")
        .with_created_at(Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap())
}

pub fn notification_frame(id: &str) -> serde_json::Value {
    json!({
        "type": "notification",
        "data": {
            "action": "new",
            "notification": {
                "id": id,
                "title": "Maintenance due",
                "message": "Vehicle 12 needs service",
                "type": "warning",
                "read": false,
                "created_at": "2024-05-01T12:00:00"
            }
        },
        "timestamp": "2024-05-01T12:00:00"
    })
}
