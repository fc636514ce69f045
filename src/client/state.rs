use super::Session;
use crate::infrastructure::{ReconnectScheduler, TaskManager};
use crate::types::constants::close_reasons;

/// Consolidated mutable state for NotificationClient.
/// Every connection state transition happens while this is write-locked.
pub struct ClientState {
    /// Bound by `init`, cleared by `shutdown`
    pub session: Option<Session>,

    /// Bumped whenever the current socket is superseded; timers and readers
    /// carrying an older epoch are stale and must not touch anything
    pub epoch: u64,

    pub scheduler: ReconnectScheduler,

    /// A fetch is owed to the store on the next successful open
    pub needs_resync: bool,

    /// Last recorded failure reason, surfaced through `status()`
    pub last_error: Option<String>,

    /// The server rejected the credential. Only an explicit `connect`,
    /// `init` or `disconnect` clears it; presence changes never retry.
    pub auth_failed: bool,

    /// Background task manager
    pub task_manager: TaskManager,
}

impl ClientState {
    pub fn new(scheduler: ReconnectScheduler) -> Self {
        Self {
            session: None,
            epoch: 0,
            scheduler,
            needs_resync: false,
            last_error: None,
            auth_failed: false,
            task_manager: TaskManager::new(),
        }
    }

    /// Invalidates everything tied to the previous socket
    pub fn next_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    /// Records a rejected credential; whatever is pushed meanwhile is fetched
    /// on the next open
    pub fn fail_auth(&mut self) {
        self.auth_failed = true;
        self.needs_resync = true;
        self.last_error = Some(close_reasons::AUTHENTICATION_FAILED.to_string());
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new(ReconnectScheduler::default())
    }
}
