//! # Realtime Notifications
//!
//! Client side of a push-notification channel: keeps one WebSocket open per
//! authenticated session, detects half-open sockets with heartbeats,
//! reconnects with bounded, jittered backoff and reconciles missed
//! notifications over REST after an outage.
//!
//! ## Example
//!
//! ```no_run
//! use realtime_notifications::{
//!     EndpointStrategy, NotificationClient, NotificationClientOptions, Session,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NotificationClient::new(NotificationClientOptions {
//!         endpoint: EndpointStrategy::inferred("fleet.example.com", true),
//!         ..Default::default()
//!     })?;
//!
//!     client.init(Session::with_token("42", "jwt-token")).await?;
//!     for notification in client.store().snapshot().await {
//!         println!("{}: {}", notification.title, notification.body);
//!     }
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod store;
pub mod types;
pub mod websocket;

pub use actions::{ActionDispatcher, AppEvent, NavigationTarget, Navigator};
pub use client::{
    ConnectionState, ConnectionStatus, CredentialSource, EndpointStrategy, NotificationClient,
    NotificationClientBuilder, NotificationClientOptions, Session, StaticToken,
};
pub use infrastructure::{FetchQuery, NetworkPresence, NotificationApi, NotificationPage};
pub use messaging::FrameType;
pub use store::NotificationStore;
pub use types::{
    ActionKind, Notification, NotificationAction, NotificationError, Result, Severity,
};
pub use websocket::{CloseFrame, Connector, FrameSink, FrameSource, TransportEvent, TransportSocket};
