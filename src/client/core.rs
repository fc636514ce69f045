use super::{
    ClientState, ConnectionManager, ConnectionState, NotificationClientBuilder,
    NotificationClientOptions, Session, endpoint,
};
use crate::actions::ActionDispatcher;
use crate::infrastructure::{
    ATTEMPT_TASKS, CONNECTION_TASKS, FetchQuery, HeartbeatManager, Liveness, NetworkPresence,
    NotificationApi, TaskKind,
};
use crate::messaging::MessageRouter;
use crate::store::NotificationStore;
use crate::types::constants::close_reasons;
use crate::types::notification::NotificationAction;
use crate::types::{NotificationError, Result};
use crate::websocket::{CloseFrame, CloseKind, Connector, FrameSource, TransportEvent, TransportSocket};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tokio::time;
use url::Url;

/// Snapshot of the connection for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub reconnect_attempts: u32,
}

/// Realtime notification client for one authenticated session.
///
/// Owns the notification socket, keeps it alive with heartbeats, reconnects
/// with bounded backoff after failures and feeds a deduplicated
/// [`NotificationStore`]. After a reconnect the store is reconciled against
/// the REST API so notifications pushed while offline are not lost.
///
/// The handle is cheap to clone; all clones drive the same connection.
///
/// # Example
///
/// ```no_run
/// use realtime_notifications::{
///     EndpointStrategy, NotificationClient, NotificationClientOptions, Session,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = NotificationClient::new(NotificationClientOptions {
///     endpoint: EndpointStrategy::explicit("wss://fleet.example.com"),
///     ..Default::default()
/// })?;
///
/// client.init(Session::with_token("42", "jwt-token")).await?;
/// println!("{} unread", client.store().unread_count().await);
/// client.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NotificationClient {
    pub(crate) endpoint: Url,
    pub(crate) options: NotificationClientOptions,

    pub(crate) connection: Arc<ConnectionManager>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,

    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) api: Arc<dyn NotificationApi>,
    pub(crate) store: NotificationStore,
    pub(crate) liveness: Liveness,
    pub(crate) presence: NetworkPresence,
    pub(crate) actions: Arc<ActionDispatcher>,
}

impl NotificationClient {
    /// Creates a client with the default transport and REST client.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Config`] or [`NotificationError::UrlParse`]
    /// when the options do not describe a usable endpoint.
    pub fn new(options: NotificationClientOptions) -> Result<Self> {
        NotificationClientBuilder::new(options).build()
    }

    pub fn builder(options: NotificationClientOptions) -> NotificationClientBuilder {
        NotificationClientBuilder::new(options)
    }

    /// Binds the client to a session, loads the most recent notifications
    /// and connects.
    ///
    /// Initialising twice for the same user is rejected; a different user
    /// shuts the previous session down first.
    pub async fn init(&self, session: Session) -> Result<()> {
        let bound_user = self
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.user_id().to_string());
        match bound_user {
            Some(user) if user == session.user_id() => {
                return Err(NotificationError::AlreadyInitialized(user));
            }
            Some(user) => {
                tracing::info!("Switching session from user {} to {}", user, session.user_id());
                self.shutdown().await?;
            }
            None => {}
        }

        tracing::info!("Initializing notifications for user {}", session.user_id());
        {
            let mut state = self.state.write().await;
            state.session = Some(session.clone());
            state.needs_resync = false;
            state.auth_failed = false;
            state.last_error = None;
            state.scheduler.reset();
        }
        self.store.bind_session(Some(session.clone())).await;

        let rejected = match self.load_initial(&session).await {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!("Initial notification load failed: {}", e);
                let mut state = self.state.write().await;
                state.needs_resync = true;
                if e.is_auth_failure() {
                    state.fail_auth();
                    self.connection.set_state(ConnectionState::Error);
                }
                e.is_auth_failure()
            }
        };

        self.spawn_presence_watcher().await;
        if rejected {
            return Ok(());
        }
        self.connect().await
    }

    /// Disconnects, stops every background task and forgets the session and
    /// its notifications.
    pub async fn shutdown(&self) -> Result<()> {
        self.disconnect().await?;
        {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
            state.session = None;
            state.needs_resync = false;
        }
        self.store.bind_session(None).await;
        self.store.clear().await;
        tracing::info!("Notification client shut down");
        Ok(())
    }

    /// Opens the notification socket.
    ///
    /// A no-op while an attempt is in flight or the socket is open. Cancels a
    /// pending reconnect and resets the attempt counter. A missing credential
    /// or an offline host leaves the client in `error` with the reason in
    /// [`status`](Self::status); handshake failures go through the reconnect
    /// schedule. Only a missing `init` is returned as an error.
    ///
    /// The handshake runs on a client task, so dropping this future does not
    /// abandon the attempt.
    pub async fn connect(&self) -> Result<()> {
        let done = {
            let mut state = self.state.write().await;
            if self.connection.state().is_active() {
                tracing::debug!("Already connected or connecting");
                return Ok(());
            }
            if state.session.is_none() {
                return Err(NotificationError::NotInitialized);
            }
            state.task_manager.abort(TaskKind::Reconnect);
            state.scheduler.reset();
            state.auth_failed = false;

            let Some((epoch, url)) = self.begin_attempt_locked(&mut state, ConnectionState::Error)
            else {
                return Ok(());
            };

            let (done_tx, done_rx) = oneshot::channel();
            let client = self.clone();
            state.task_manager.spawn(TaskKind::Handshake, async move {
                client.establish(epoch, url).await;
                let _ = done_tx.send(());
            });
            done_rx
        };

        // Err means the attempt was torn down before it finished
        let _ = done.await;
        Ok(())
    }

    /// Closes the socket with a normal code and cancels heartbeat and
    /// reconnect timers. Always succeeds and clears the recorded error.
    pub async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.write().await;
        tracing::info!("Disconnecting from notification server");

        self.teardown_locked(&mut state, CloseFrame::normal("client disconnect"))
            .await;
        state.last_error = None;
        state.auth_failed = false;
        state.scheduler.reset();
        self.connection.set_state(ConnectionState::Disconnected);

        tracing::info!("Disconnected from notification server");
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub async fn status(&self) -> ConnectionStatus {
        let state = self.state.read().await;
        ConnectionStatus {
            state: self.connection.state(),
            last_error: state.last_error.clone(),
            reconnect_attempts: state.scheduler.attempts(),
        }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn presence(&self) -> &NetworkPresence {
        &self.presence
    }

    pub fn actions(&self) -> &ActionDispatcher {
        &self.actions
    }

    pub fn execute_action(&self, action: &NotificationAction) -> Result<()> {
        self.actions.execute(action)
    }

    pub async fn mark_read(&self, id: &str) -> Result<bool> {
        self.store.mark_read(id).await
    }

    pub async fn mark_all_read(&self) -> Result<usize> {
        self.store.mark_all_read().await
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn load_initial(&self, session: &Session) -> Result<()> {
        let Some(token) = session.token() else {
            return Ok(());
        };
        let page = self
            .api
            .fetch_recent(
                &token,
                FetchQuery {
                    limit: self.options.fetch_limit(),
                    unread_only: false,
                },
            )
            .await?;
        let added = self.store.merge(page.notifications).await;
        tracing::info!("Loaded {} notifications ({} unread on server)", added, page.unread_count);
        Ok(())
    }

    async fn spawn_presence_watcher(&self) {
        let client = self.clone();
        let mut online = self.presence.subscribe();

        let mut state = self.state.write().await;
        state.task_manager.spawn(TaskKind::Presence, async move {
            while online.changed().await.is_ok() {
                let is_online = *online.borrow_and_update();
                if is_online {
                    client.handle_online().await;
                } else {
                    client.handle_offline().await;
                }
            }
            tracing::debug!("Presence watcher finished");
        });
    }

    async fn handle_online(&self) {
        {
            let mut state = self.state.write().await;
            if state.session.is_none() {
                return;
            }
            if state.auth_failed {
                tracing::info!("Back online, credential was rejected, waiting for connect()");
                return;
            }
            state.scheduler.reset();
        }
        tracing::info!("Back online, reconnecting");
        if let Err(e) = self.connect().await {
            tracing::error!("Reconnect after coming online failed: {}", e);
        }
    }

    async fn handle_offline(&self) {
        let mut state = self.state.write().await;
        if state.session.is_none() {
            return;
        }
        if state.auth_failed {
            // No socket is left open after a rejection; keep the error visible
            tracing::debug!("Network offline while the credential is rejected");
            return;
        }
        tracing::warn!("Network offline, closing notification socket");

        if self.connection.state() != ConnectionState::Disconnected {
            state.needs_resync = true;
        }
        self.teardown_locked(&mut state, CloseFrame::normal(close_reasons::NETWORK_OFFLINE))
            .await;
        state.last_error = Some(close_reasons::NETWORK_OFFLINE.to_string());
        self.connection.set_state(ConnectionState::Disconnected);
    }

    /// Checks the preconditions of an attempt and moves to `connecting`.
    /// On failure records the reason, moves to `on_failure` and returns `None`.
    fn begin_attempt_locked(
        &self,
        state: &mut ClientState,
        on_failure: ConnectionState,
    ) -> Option<(u64, Url)> {
        let token = state.session.as_ref().and_then(Session::token);
        let Some(token) = token else {
            tracing::warn!("No credential available, not connecting");
            state.last_error = Some(close_reasons::TOKEN_MISSING.to_string());
            self.connection.set_state(on_failure);
            return None;
        };
        if !self.presence.is_online() {
            tracing::info!("Network offline, not connecting");
            state.last_error = Some(close_reasons::NETWORK_OFFLINE.to_string());
            self.connection.set_state(on_failure);
            return None;
        }

        let epoch = state.next_epoch();
        self.connection.set_state(ConnectionState::Connecting);
        Some((epoch, endpoint::with_token(&self.endpoint, &token)))
    }

    /// Fired by the reconnect timer of `epoch`
    async fn reconnect_now(&self, epoch: u64) {
        let attempt = {
            let mut state = self.state.write().await;
            if state.epoch != epoch || self.connection.state() != ConnectionState::Reconnecting {
                tracing::debug!("Reconnect timer superseded");
                return;
            }
            self.begin_attempt_locked(&mut state, ConnectionState::Disconnected)
        };

        if let Some((epoch, url)) = attempt {
            tracing::info!("Attempting to reconnect...");
            self.establish(epoch, url).await;
        }
    }

    async fn establish(&self, epoch: u64, url: Url) {
        tracing::info!("Connecting to {}", self.endpoint);

        let result = match time::timeout(self.options.timeout(), self.connector.connect(&url)).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout),
        };

        match result {
            Ok(socket) => self.on_open(epoch, socket).await,
            Err(e) => self.on_connect_failed(epoch, e).await,
        }
    }

    async fn on_open(&self, epoch: u64, socket: TransportSocket) {
        let TransportSocket { mut sink, source } = socket;

        let resync = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                drop(state);
                tracing::debug!("Connection attempt superseded, discarding socket");
                let _ = sink.close(CloseFrame::normal("superseded")).await;
                return;
            }

            self.connection.set_sink(sink).await;
            state.scheduler.reset();
            state.last_error = None;
            self.connection.set_state(ConnectionState::Connected);

            let (force_close_tx, force_close_rx) = mpsc::channel(1);
            self.spawn_reader(&mut state, epoch, source, force_close_rx);

            let heartbeat = HeartbeatManager::new(
                Arc::downgrade(&self.connection),
                self.liveness.subscribe(),
                force_close_tx,
            )
            .with_interval(self.options.heartbeat_interval())
            .with_timeout(self.options.heartbeat_timeout());
            state.task_manager.spawn(TaskKind::Heartbeat, heartbeat.run());

            std::mem::take(&mut state.needs_resync)
        };

        tracing::info!("Connected to notification server");
        if resync {
            self.resync(epoch).await;
        }
    }

    async fn on_connect_failed(&self, epoch: u64, error: NotificationError) {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return;
        }

        if error.is_auth_failure() {
            tracing::error!("Server rejected credential: {}", error);
            state.fail_auth();
            self.connection.set_state(ConnectionState::Error);
            return;
        }

        tracing::error!("Connection attempt failed: {}", error);
        self.schedule_reconnect_locked(&mut state, error.to_string());
    }

    fn spawn_reader(
        &self,
        state: &mut ClientState,
        epoch: u64,
        source: Box<dyn FrameSource>,
        force_close: mpsc::Receiver<()>,
    ) {
        let client = self.clone();
        let router = MessageRouter::new(
            self.store.clone(),
            self.liveness.clone(),
            Arc::clone(&self.state),
        );

        state.task_manager.spawn(TaskKind::Reader, async move {
            tracing::debug!("Starting read task");
            let frame = read_loop(source, force_close, &router).await;
            client.handle_close(epoch, frame).await;
            tracing::debug!("Read task finished");
        });
    }

    async fn handle_close(&self, epoch: u64, frame: CloseFrame) {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            tracing::debug!("Ignoring close of superseded connection");
            return;
        }

        state.task_manager.abort(TaskKind::Heartbeat);
        self.connection.clear_sink().await;

        match frame.kind() {
            CloseKind::Normal => {
                tracing::info!("Server closed connection normally");
                state.needs_resync = true;
                state.last_error = None;
                self.connection.set_state(ConnectionState::Disconnected);
            }
            CloseKind::AuthRejected => {
                tracing::error!(
                    "Server rejected credential: code={}, reason='{}'",
                    frame.code,
                    frame.reason
                );
                state.fail_auth();
                self.connection.set_state(ConnectionState::Error);
            }
            kind => {
                tracing::warn!(
                    "Connection closed: code={}, reason='{}'",
                    frame.code,
                    frame.reason
                );
                let reason = match kind {
                    CloseKind::Abnormal => close_reasons::CONNECTION_LOST.to_string(),
                    CloseKind::ServerError => close_reasons::SERVER_ERROR.to_string(),
                    _ if frame.reason.is_empty() => format!("connection closed with code {}", frame.code),
                    _ => frame.reason.clone(),
                };
                self.schedule_reconnect_locked(&mut state, reason);
            }
        }
    }

    fn schedule_reconnect_locked(&self, state: &mut ClientState, reason: String) {
        state.needs_resync = true;
        state.last_error = Some(reason);

        if !self.presence.is_online() {
            tracing::info!("Offline, waiting for the network before reconnecting");
            self.connection.set_state(ConnectionState::Disconnected);
            return;
        }

        let Some(delay) = state.scheduler.next_delay() else {
            tracing::error!(
                "Giving up after {} reconnection attempts",
                state.scheduler.max_attempts()
            );
            state.last_error = Some(close_reasons::MAX_ATTEMPTS_REACHED.to_string());
            self.connection.set_state(ConnectionState::Error);
            return;
        };

        tracing::info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            state.scheduler.attempts(),
            state.scheduler.max_attempts()
        );
        self.connection.set_state(ConnectionState::Reconnecting);

        let epoch = state.epoch;
        let client = self.clone();
        state.task_manager.spawn(TaskKind::Reconnect, async move {
            time::sleep(delay).await;
            client.reconnect_now(epoch).await;
        });
    }

    /// Pulls what was missed while disconnected into the store
    async fn resync(&self, epoch: u64) {
        let token = self
            .state
            .read()
            .await
            .session
            .as_ref()
            .and_then(Session::token);
        let Some(token) = token else {
            self.state.write().await.needs_resync = true;
            return;
        };

        let query = FetchQuery {
            limit: self.options.fetch_limit(),
            unread_only: false,
        };
        match self.api.fetch_recent(&token, query).await {
            Ok(page) => {
                let added = self.store.merge(page.notifications).await;
                tracing::info!("Resync merged {} missed notifications", added);
            }
            Err(e) if e.is_auth_failure() => {
                let mut state = self.state.write().await;
                if state.epoch != epoch {
                    return;
                }
                tracing::error!("Resync rejected credential: {}", e);
                // May run on the reconnect task itself, which must not abort itself
                self.close_socket_locked(
                    &mut state,
                    CloseFrame::normal(close_reasons::AUTHENTICATION_FAILED),
                )
                .await;
                state.fail_auth();
                self.connection.set_state(ConnectionState::Error);
            }
            Err(e) => {
                tracing::warn!("Resync failed, will retry on next connect: {}", e);
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    state.needs_resync = true;
                }
            }
        }
    }

    /// Invalidates the current socket and every timer, then closes it
    async fn teardown_locked(&self, state: &mut ClientState, frame: CloseFrame) {
        state.task_manager.abort_many(&ATTEMPT_TASKS);
        self.close_socket_locked(state, frame).await;
    }

    async fn close_socket_locked(&self, state: &mut ClientState, frame: CloseFrame) {
        state.next_epoch();
        state.task_manager.abort_many(&CONNECTION_TASKS);

        match time::timeout(self.options.timeout(), self.connection.close(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Close handshake failed: {}", e),
            Err(_) => {
                tracing::debug!("Close handshake timed out");
                self.connection.clear_sink().await;
            }
        }
    }
}

/// Reads until the socket closes or the heartbeat forces it closed
async fn read_loop(
    mut source: Box<dyn FrameSource>,
    mut force_close: mpsc::Receiver<()>,
    router: &MessageRouter,
) -> CloseFrame {
    loop {
        tokio::select! {
            event = source.next_event() => match event {
                Some(TransportEvent::Text(text)) => {
                    tracing::debug!("Received text message: {}", text);
                    router.route_text(&text).await;
                }
                Some(TransportEvent::Closed(frame)) => return frame,
                None => {
                    tracing::warn!("Stream ended without close frame");
                    return CloseFrame::abnormal(close_reasons::CONNECTION_LOST);
                }
            },
            Some(()) = force_close.recv() => {
                return CloseFrame::abnormal(close_reasons::HEARTBEAT_TIMEOUT);
            }
        }
    }
}
