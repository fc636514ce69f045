use super::{ClientState, ConnectionManager, EndpointStrategy, NotificationClient};
use crate::actions::ActionDispatcher;
use crate::infrastructure::{
    HttpNotificationApi, Liveness, NetworkPresence, NotificationApi, ReconnectScheduler,
    ws_to_http_endpoint,
};
use crate::store::NotificationStore;
use crate::types::constants::{
    API_PREFIX, DEFAULT_FETCH_LIMIT, DEFAULT_TIMEOUT, HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT,
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_JITTER, RECONNECT_MAX_DELAY,
};
use crate::types::{NotificationError, Result};
use crate::websocket::{Connector, WebSocketFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Client options. Millisecond fields left `None` fall back to the crate defaults.
#[derive(Debug, Clone)]
pub struct NotificationClientOptions {
    pub endpoint: EndpointStrategy,
    /// REST base, derived from the socket endpoint when `None`
    pub api_endpoint: Option<String>,
    pub timeout: Option<u64>,
    pub heartbeat_interval: Option<u64>,
    pub heartbeat_timeout: Option<u64>,
    pub reconnect_base_delay: Option<u64>,
    pub reconnect_max_delay: Option<u64>,
    pub reconnect_jitter: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
    pub fetch_limit: Option<u32>,
}

impl Default for NotificationClientOptions {
    fn default() -> Self {
        Self {
            endpoint: EndpointStrategy::inferred("localhost", false),
            api_endpoint: None,
            timeout: None,
            heartbeat_interval: None,
            heartbeat_timeout: None,
            reconnect_base_delay: None,
            reconnect_max_delay: None,
            reconnect_jitter: None,
            max_reconnect_attempts: None,
            fetch_limit: None,
        }
    }
}

impl NotificationClientOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout.unwrap_or(HEARTBEAT_TIMEOUT))
    }

    pub fn fetch_limit(&self) -> u32 {
        self.fetch_limit.unwrap_or(DEFAULT_FETCH_LIMIT)
    }

    pub fn scheduler(&self) -> ReconnectScheduler {
        ReconnectScheduler::new(
            Duration::from_millis(self.reconnect_base_delay.unwrap_or(RECONNECT_BASE_DELAY)),
            Duration::from_millis(self.reconnect_max_delay.unwrap_or(RECONNECT_MAX_DELAY)),
            Duration::from_millis(self.reconnect_jitter.unwrap_or(RECONNECT_JITTER)),
            self.max_reconnect_attempts.unwrap_or(MAX_RECONNECT_ATTEMPTS),
        )
    }

    fn validate(&self) -> Result<()> {
        let nonzero = [
            ("timeout", self.timeout),
            ("heartbeat_interval", self.heartbeat_interval),
            ("heartbeat_timeout", self.heartbeat_timeout),
            ("reconnect_base_delay", self.reconnect_base_delay),
        ];
        if let Some((name, _)) = nonzero.iter().find(|(_, value)| *value == Some(0)) {
            return Err(NotificationError::Config(format!("{} must be greater than zero", name)));
        }
        if self.fetch_limit == Some(0) {
            return Err(NotificationError::Config(
                "fetch_limit must be greater than zero".to_string(),
            ));
        }

        let base = self.reconnect_base_delay.unwrap_or(RECONNECT_BASE_DELAY);
        let max = self.reconnect_max_delay.unwrap_or(RECONNECT_MAX_DELAY);
        if base > max {
            return Err(NotificationError::Config(
                "reconnect_base_delay must not exceed reconnect_max_delay".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for NotificationClient that wires its collaborators
pub struct NotificationClientBuilder {
    options: NotificationClientOptions,
    connector: Option<Arc<dyn Connector>>,
    api: Option<Arc<dyn NotificationApi>>,
    presence: Option<NetworkPresence>,
    actions: Option<ActionDispatcher>,
}

impl NotificationClientBuilder {
    pub fn new(options: NotificationClientOptions) -> Self {
        Self {
            options,
            connector: None,
            api: None,
            presence: None,
            actions: None,
        }
    }

    /// Replaces the tungstenite transport
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replaces the reqwest REST client
    pub fn with_api(mut self, api: Arc<dyn NotificationApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_presence(mut self, presence: NetworkPresence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn with_action_dispatcher(mut self, actions: ActionDispatcher) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Validates the options and assembles the client; nothing is spawned
    /// until [`NotificationClient::init`].
    pub fn build(self) -> Result<NotificationClient> {
        self.options.validate()?;
        let endpoint = self.options.endpoint.resolve()?;

        let api = match self.api {
            Some(api) => api,
            None => {
                let base = match &self.options.api_endpoint {
                    Some(base) => base.clone(),
                    None => ws_to_http_endpoint(&endpoint, API_PREFIX)?.to_string(),
                };
                tracing::debug!("REST endpoint: {}", base);
                Arc::new(HttpNotificationApi::new(base, self.options.timeout())?)
            }
        };
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketFactory));

        let client_state = ClientState::new(self.options.scheduler());

        Ok(NotificationClient {
            endpoint,
            connection: Arc::new(ConnectionManager::new()),
            state: Arc::new(RwLock::new(client_state)),
            store: NotificationStore::new(Arc::clone(&api)),
            liveness: Liveness::new(),
            presence: self.presence.unwrap_or_default(),
            actions: Arc::new(self.actions.unwrap_or_default()),
            connector,
            api,
            options: self.options,
        })
    }
}
