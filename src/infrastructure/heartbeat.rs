use crate::client::ConnectionManager;
use crate::types::constants::{HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT};
use crate::types::message::OutboundFrame;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(HEARTBEAT_INTERVAL);
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(HEARTBEAT_TIMEOUT);

/// Counter bumped on every inbound liveness frame.
///
/// The router signals, the heartbeat task waits for a bump after each probe.
#[derive(Clone)]
pub struct Liveness {
    tx: Arc<watch::Sender<u64>>,
}

impl Liveness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn signal(&self) {
        self.tx.send_modify(|seen| *seen = seen.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HeartbeatManager {
    interval: Duration,
    timeout: Duration,
    connection: Weak<ConnectionManager>,
    liveness: watch::Receiver<u64>,
    force_close: mpsc::Sender<()>,
}

impl HeartbeatManager {
    /// `force_close` is raised once when a probe goes unanswered; the reader
    /// of the same connection owns the socket and performs the abrupt close.
    pub fn new(
        connection: Weak<ConnectionManager>,
        liveness: watch::Receiver<u64>,
        force_close: mpsc::Sender<()>,
    ) -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            connection,
            liveness,
            force_close,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe loop, runs until the connection goes away or a probe times out
    pub async fn run(mut self) {
        let mut interval_timer = time::interval_at(Instant::now() + self.interval, self.interval);
        interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;

            let Some(connection) = self.connection.upgrade() else {
                // Client dropped
                break;
            };
            if !connection.is_connected() {
                break;
            }

            // Only signals that arrive after this probe count
            let _ = self.liveness.borrow_and_update();

            // A stalled write counts against the same window as the reply
            let deadline = Instant::now() + self.timeout;
            let probe = OutboundFrame::heartbeat();
            let probed = match time::timeout_at(deadline, connection.send_frame(&probe)).await {
                Ok(Ok(())) => {
                    tracing::debug!("Sent heartbeat");
                    true
                }
                Ok(Err(e)) => {
                    tracing::warn!("[Heartbeat] Failed to send: {}", e);
                    true
                }
                Err(_) => false,
            };
            drop(connection);

            let acknowledged = probed
                && match time::timeout_at(deadline, self.liveness.changed()).await {
                    Ok(Ok(())) => true,
                    Ok(Err(_)) => break,
                    Err(_) => false,
                };

            if acknowledged {
                tracing::debug!("Heartbeat acknowledged");
                continue;
            }
            tracing::warn!(
                "[Heartbeat] No liveness signal within {:?}, closing connection",
                self.timeout
            );
            if self.force_close.send(()).await.is_err() {
                tracing::debug!("Reader already gone, nothing to force-close");
            }
            break;
        }

        tracing::debug!("Heartbeat task finished");
    }
}
