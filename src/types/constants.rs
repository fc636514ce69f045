/// Frame `type` strings (magic strings layer)
pub mod frame_types {
    pub const NOTIFICATION: &str = "notification";
    pub const NOTIFICATION_READ: &str = "notification_read";
    pub const NOTIFICATIONS_READ_ALL: &str = "notifications_read_all";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const HEARTBEAT_RESPONSE: &str = "heartbeat_response";
    pub const CONNECTION_ESTABLISHED: &str = "connection_established";
    pub const ERROR: &str = "error";
}

/// `data.action` values carried by notification frames
pub mod notification_events {
    pub const NEW: &str = "new";
    pub const READ: &str = "read";
}

/// Reasons recorded in `last_error`
pub mod close_reasons {
    pub const CONNECTION_LOST: &str = "connection lost unexpectedly";
    pub const SERVER_ERROR: &str = "server error";
    pub const AUTHENTICATION_FAILED: &str = "authentication failed";
    pub const TOKEN_MISSING: &str = "authentication token missing";
    pub const NETWORK_OFFLINE: &str = "network offline";
    pub const MAX_ATTEMPTS_REACHED: &str = "max reconnection attempts reached";
    pub const MESSAGE_PARSING_ERROR: &str = "message parsing error";
    pub const HEARTBEAT_TIMEOUT: &str = "heartbeat timeout";
}

/// WebSocket endpoint path on the notification backend
pub const WS_NOTIFICATIONS_PATH: &str = "/api/v1/ws/notifications";

/// REST prefix on the notification backend
pub const API_PREFIX: &str = "/api/v1";

/// Port the backend listens on in local and private-network deployments
pub const DEV_BACKEND_PORT: u16 = 8000;

/// Query parameter carrying the auth credential on the WebSocket URL
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Default request timeout (milliseconds)
pub const DEFAULT_TIMEOUT: u64 = 10_000;

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30_000;

/// Default wait for a liveness signal after a probe (milliseconds)
pub const HEARTBEAT_TIMEOUT: u64 = 10_000;

/// Reconnect backoff defaults (milliseconds)
pub const RECONNECT_BASE_DELAY: u64 = 1_000;
pub const RECONNECT_MAX_DELAY: u64 = 30_000;
pub const RECONNECT_JITTER: u64 = 1_000;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Page size for the initial and resync fetch
pub const DEFAULT_FETCH_LIMIT: u32 = 50;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_UNSUPPORTED_DATA: u16 = 1003;
pub const WS_CLOSE_NO_STATUS: u16 = 1005;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;
pub const WS_CLOSE_POLICY_VIOLATION: u16 = 1008;
pub const WS_CLOSE_SERVER_ERROR: u16 = 1011;
