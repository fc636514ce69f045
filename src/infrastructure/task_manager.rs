use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Background work owned by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Reads frames from the active socket
    Reader,
    /// Probes the active socket
    Heartbeat,
    /// Pending reconnect delay
    Reconnect,
    /// Handshake started by `connect`
    Handshake,
    /// Follows network online/offline transitions
    Presence,
}

/// Connection-scoped tasks, cancelled together on close and disconnect
pub const CONNECTION_TASKS: [TaskKind; 2] = [TaskKind::Reader, TaskKind::Heartbeat];

/// Tasks working towards a new socket, cancelled by teardown
pub const ATTEMPT_TASKS: [TaskKind; 2] = [TaskKind::Reconnect, TaskKind::Handshake];

/// Manages background tasks with proper lifecycle handling
pub struct TaskManager {
    handles: HashMap<TaskKind, JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Spawn a task and track it under `kind`.
    ///
    /// A previous handle of the same kind is released, not aborted: a reconnect
    /// task schedules its own successor.
    pub fn spawn<F>(&mut self, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.handles.insert(kind, handle);
    }

    /// Abort one task, if tracked
    pub fn abort(&mut self, kind: TaskKind) {
        if let Some(handle) = self.handles.remove(&kind) {
            handle.abort();
        }
    }

    pub fn abort_many(&mut self, kinds: &[TaskKind]) {
        for kind in kinds {
            self.abort(*kind);
        }
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    pub fn is_running(&self, kind: TaskKind) -> bool {
        self.handles
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
