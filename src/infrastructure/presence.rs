use std::sync::Arc;
use tokio::sync::watch;

/// Host network online flag.
///
/// The embedding application feeds platform online/offline events into
/// [`set_online`](Self::set_online); the client follows the transitions.
#[derive(Clone)]
pub struct NetworkPresence {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkPresence {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Record a transition; repeated values are not re-broadcast
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(
                "Network is now {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for NetworkPresence {
    fn default() -> Self {
        Self::new(true)
    }
}
