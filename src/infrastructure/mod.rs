// Infrastructure module - Core background services and utilities
pub mod heartbeat;
pub mod http;
pub mod presence;
pub mod task_manager;
pub mod timer;

pub use heartbeat::{HeartbeatManager, Liveness};
pub use http::{FetchQuery, HttpNotificationApi, NotificationApi, NotificationPage, ws_to_http_endpoint};
pub use presence::NetworkPresence;
pub use task_manager::{ATTEMPT_TASKS, CONNECTION_TASKS, TaskKind, TaskManager};
pub use timer::ReconnectScheduler;
