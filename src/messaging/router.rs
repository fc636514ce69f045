use super::event::{ErrorPayload, FrameType, NotificationEvent, NotificationPayload, NotificationReadPayload};
use crate::client::ClientState;
use crate::infrastructure::Liveness;
use crate::store::NotificationStore;
use crate::types::constants::close_reasons;
use crate::types::message::InboundFrame;
use crate::types::{NotificationError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Routes incoming frames to the store or to liveness handling.
///
/// Frames are handled one at a time in arrival order; a malformed frame is
/// recorded and dropped, it never tears the connection down.
pub struct MessageRouter {
    store: NotificationStore,
    liveness: Liveness,
    state: Arc<RwLock<ClientState>>,
}

impl MessageRouter {
    pub fn new(store: NotificationStore, liveness: Liveness, state: Arc<RwLock<ClientState>>) -> Self {
        Self {
            store,
            liveness,
            state,
        }
    }

    /// Parses and routes one text frame
    pub async fn route_text(&self, text: &str) {
        match serde_json::from_str::<InboundFrame>(text) {
            Ok(frame) => {
                tracing::debug!("Parsed frame: type={}", frame.frame_type);
                self.route(frame).await;
            }
            Err(e) => {
                tracing::error!("Failed to parse message: {} - Raw: {}", e, text);
                self.record_error(close_reasons::MESSAGE_PARSING_ERROR).await;
            }
        }
    }

    /// Routes a parsed frame to the appropriate handler
    pub async fn route(&self, frame: InboundFrame) {
        let frame_type = frame.frame_type.clone();
        if let Err(e) = self.dispatch(frame).await {
            tracing::error!("Failed to handle {} frame: {}", frame_type, e);
            self.record_error(close_reasons::MESSAGE_PARSING_ERROR).await;
        }
    }

    async fn dispatch(&self, frame: InboundFrame) -> Result<()> {
        if frame.frame_type.is_liveness() {
            tracing::debug!("Liveness signal: {}", frame.frame_type);
            self.liveness.signal();
            return Ok(());
        }

        match frame.frame_type {
            FrameType::Notification => {
                let payload: NotificationPayload = parse_data(frame.data)?;
                self.handle_notification(payload).await;
            }
            FrameType::NotificationRead => {
                let payload: NotificationReadPayload = parse_data(frame.data)?;
                if !self.store.mark_read_local(&payload.notification_id).await {
                    tracing::debug!(
                        "Read update for unknown notification {}",
                        payload.notification_id
                    );
                }
            }
            FrameType::NotificationsReadAll => {
                let changed = self.store.mark_all_read_local().await;
                tracing::debug!("Server marked all read, {} local entries changed", changed);
            }
            FrameType::Error => {
                let payload: ErrorPayload = serde_json::from_value(frame.data).unwrap_or_default();
                tracing::warn!("Server reported error: {}", payload.message);
                let message = if payload.message.is_empty() {
                    close_reasons::SERVER_ERROR.to_string()
                } else {
                    payload.message
                };
                self.record_error(message).await;
            }
            FrameType::Unknown(other) => {
                tracing::debug!("Ignoring unrecognized frame type: {}", other);
            }
            FrameType::Heartbeat | FrameType::HeartbeatResponse | FrameType::ConnectionEstablished => {}
        }
        Ok(())
    }

    async fn handle_notification(&self, payload: NotificationPayload) {
        let NotificationPayload {
            action,
            notification,
        } = payload;

        match action {
            NotificationEvent::New => {
                let id = notification.id.clone();
                if self.store.append(notification).await {
                    tracing::debug!("Stored notification {}", id);
                } else {
                    tracing::debug!("Duplicate notification {} ignored", id);
                }
            }
            NotificationEvent::Read => {
                let id = notification.id.clone();
                if !self.store.mark_read_local(&id).await {
                    self.store.append(notification.with_read(true)).await;
                }
            }
        }
    }

    async fn record_error(&self, message: impl Into<String>) {
        self.state.write().await.last_error = Some(message.into());
    }
}

fn parse_data<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| NotificationError::Parse(e.to_string()))
}
