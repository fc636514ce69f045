// Module declarations
mod builder;
mod connection;
mod core;
pub mod endpoint;
mod session;
mod state;

// Public API exports
pub use builder::{NotificationClientBuilder, NotificationClientOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use self::core::{ConnectionStatus, NotificationClient};
pub use endpoint::{EndpointStrategy, HostClass, classify_host};
pub use session::{CredentialSource, Session, StaticToken};
pub use state::ClientState;
