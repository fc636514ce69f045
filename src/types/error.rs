use thiserror::Error;

/// Errors that can occur when using the notification client.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected the credential during the WebSocket handshake
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A REST call answered 401; the session has to be re-authenticated
    #[error("Authentication expired")]
    Unauthorized,

    /// A REST call answered with a non-success status other than 401
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error from the REST client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed endpoint or navigation target)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// An inbound frame could not be understood
    #[error("Message parsing error: {0}")]
    Parse(String),

    /// A notification action could not be dispatched
    #[error("Action error: {0}")]
    Action(String),

    /// Client options failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Operation timed out
    #[error("Timeout error")]
    Timeout,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// `init` called while a session is already bound
    #[error("Already initialized for user {0}")]
    AlreadyInitialized(String),

    /// Operation needs a session but `init` was never called
    #[error("Not initialized")]
    NotInitialized,
}

impl NotificationError {
    /// Failures that only re-authentication can heal.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Auth(_))
    }

    /// Failures after which local optimistic state is rolled back.
    pub fn is_recoverable(&self) -> bool {
        !self.is_auth_failure()
    }
}

/// Convenience type alias for `Result<T, NotificationError>`.
pub type Result<T> = std::result::Result<T, NotificationError>;
