//! `ConnectionManager` and the `SessionHandle` it returns.
//!
//! This is the entry point for running a chat session. It ties together
//! all the layers: transport → protocol → session.
//!
//! ```text
//!   caller ──open()──→ ConnectionManager ──spawn──→ session task
//!     │                                               │  owns transport,
//!     │ SessionHandle ──commands (mpsc)─────────────→ │  store, reconciler
//!     │               ←──snapshots (watch)─────────── │
//!     │ Receiver      ←──events (mpsc)─────────────── │
//! ```
//!
//! The handle is the only way to reach a session. There is no global
//! connection; two handles from the same manager share nothing.

use std::sync::Arc;
use std::time::Duration;

use parley_protocol::{Codec, Identity, JsonCodec, RoomId};
use parley_session::{
    AccountService, CloseReason, ConnectionState, CorrelationId, Credentials,
    Message, SessionError, SessionSnapshot, validate_body, validate_credentials,
};
use parley_transport::Connector;
use rand::Rng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::actor::{Command, SessionTask};
use crate::{ChatError, ClientConfig, EndpointResolver};

/// Something that happened to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The server accepted the login. Sends are allowed from now on.
    Activated(Identity),
    /// A new entry went to the end of the log: a local send (provisional)
    /// or a message from the server (confirmed).
    MessageAppended(Message),
    /// Our own echo arrived; this provisional entry is now confirmed.
    MessageConfirmed(CorrelationId),
    /// A send did not go out. `id` is set when a provisional entry had
    /// been inserted; it has been removed again.
    SendFailed {
        id: Option<CorrelationId>,
        reason: String,
    },
    /// No echo within the echo window. The entry stays provisional.
    EchoOverdue(CorrelationId),
    /// The session ended. Always the last event.
    Closed(CloseReason),
}

/// Opens chat sessions over a [`Connector`].
///
/// Generic over the transport (`K`) and the wire codec (`D`), so tests can
/// run a whole session over an in-memory pipe.
///
/// # Example
///
/// ```rust,no_run
/// use parley::prelude::*;
///
/// # async fn demo() -> Result<(), ChatError> {
/// let manager = ConnectionManager::new(WebSocketConnector);
/// let origin = PageOrigin::parse("http://localhost:5173")?;
/// let identity = Identity::new("alice")?;
///
/// let (mut session, _events) = manager.connect(&origin, identity).await?;
/// session.send("hello")?;
/// session.close().await;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager<K, D = JsonCodec> {
    connector: Arc<K>,
    codec: Arc<D>,
    config: ClientConfig,
}

impl<K: Connector> ConnectionManager<K, JsonCodec> {
    /// Creates a manager that speaks JSON with default settings.
    pub fn new(connector: K) -> Self {
        Self::with_codec(connector, JsonCodec)
    }
}

impl<K, D> ConnectionManager<K, D>
where
    K: Connector,
    D: Codec,
{
    pub fn with_codec(connector: K, codec: D) -> Self {
        Self {
            connector: Arc::new(connector),
            codec: Arc::new(codec),
            config: ClientConfig::default(),
        }
    }

    /// Replaces the configuration used for sessions opened from now on.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Starts a session and returns right away.
    ///
    /// The handle starts out `Connecting`. The session task opens the
    /// transport and sends `login`; readiness is reported through
    /// [`SessionHandle::wait_active`], the snapshot channel, and the
    /// [`SessionEvent::Activated`] event.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(
        &self,
        resolver: &impl EndpointResolver,
        identity: Identity,
    ) -> (SessionHandle, mpsc::Receiver<SessionEvent>) {
        let url = resolver.resolve(&self.config);
        let session_tag = generate_session_tag();

        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            state: ConnectionState::Connecting,
            ..SessionSnapshot::default()
        });
        let snapshots = Arc::new(snapshot_tx);
        let (event_tx, event_rx) = mpsc::channel(self.config.event_capacity());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (alive_tx, alive_rx) = watch::channel(());

        let span = tracing::info_span!("session", tag = %session_tag, %identity);
        let task = SessionTask {
            connector: Arc::clone(&self.connector),
            codec: Arc::clone(&self.codec),
            config: self.config.clone(),
            url,
            identity,
            snapshots: Arc::clone(&snapshots),
            events: event_tx,
            commands: command_rx,
            shutdown: shutdown_rx,
            alive: alive_tx,
        };
        let join = tokio::spawn(task.run().instrument(span));

        let handle = SessionHandle {
            commands: command_tx,
            snapshots,
            shutdown: Some(shutdown_tx),
            task: Some(join),
            alive: alive_rx,
            session_tag,
            handshake_timeout: self.config.handshake_timeout,
            close_timeout: self.config.close_timeout,
        };
        (handle, event_rx)
    }

    /// Starts a session and waits until the server accepts the login.
    ///
    /// # Errors
    /// - [`ChatError::AuthenticationRejected`]: `login_response` said no.
    /// - [`ChatError::HandshakeTimeout`]: no answer in time.
    /// - [`ChatError::ConnectionLost`]: the transport failed first.
    ///
    /// The session is closed before any error is returned.
    pub async fn connect(
        &self,
        resolver: &impl EndpointResolver,
        identity: Identity,
    ) -> Result<(SessionHandle, mpsc::Receiver<SessionEvent>), ChatError> {
        let (mut handle, events) = self.open(resolver, identity);
        let activated = handle.wait_active().await;
        match activated {
            Ok(_) => Ok((handle, events)),
            Err(e) => {
                handle.close().await;
                Err(e)
            }
        }
    }

    /// Signs in with the account service, then connects with the identity
    /// it returned.
    ///
    /// # Errors
    /// [`SessionError::Validation`] for blank credentials (nothing is sent),
    /// [`SessionError::AuthFailed`] from the account service, or any
    /// [`connect`](Self::connect) error.
    pub async fn sign_in<A: AccountService>(
        &self,
        accounts: &A,
        credentials: &Credentials,
        resolver: &impl EndpointResolver,
    ) -> Result<(SessionHandle, mpsc::Receiver<SessionEvent>), ChatError> {
        validate_credentials(credentials)?;
        let identity = accounts.login(credentials).await?;
        tracing::info!(%identity, "account login accepted");
        self.connect(resolver, identity).await
    }

    /// Registers a new account, then signs in with it.
    ///
    /// # Errors
    /// [`SessionError::Validation`] for blank credentials (nothing is sent),
    /// [`SessionError::AuthFailed`] if registration or login is refused,
    /// or any [`connect`](Self::connect) error.
    pub async fn sign_up<A: AccountService>(
        &self,
        accounts: &A,
        credentials: &Credentials,
        email: Option<&str>,
        resolver: &impl EndpointResolver,
    ) -> Result<(SessionHandle, mpsc::Receiver<SessionEvent>), ChatError> {
        validate_credentials(credentials)?;
        accounts.register(credentials, email).await?;
        tracing::info!(username = %credentials.username, "account registered");
        self.sign_in(accounts, credentials, resolver).await
    }
}

/// Owned handle to one running session.
///
/// Dropping the handle aborts the session task, which releases the
/// transport. Call [`close`](Self::close) for an orderly shutdown.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    /// Closed once the session task is gone.
    alive: watch::Receiver<()>,
    session_tag: String,
    handshake_timeout: Duration,
    close_timeout: Duration,
}

impl SessionHandle {
    /// Random tag identifying this session in logs.
    pub fn session_tag(&self) -> &str {
        &self.session_tag
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshots.borrow().state
    }

    /// The current state, identity, room, and log.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Sends `body` to the selected room.
    ///
    /// Returns once the send is queued. The provisional entry, the echo,
    /// and any write failure show up later as events.
    ///
    /// # Errors
    /// [`SessionError::Validation`] for a blank body, checked first;
    /// [`SessionError::NotConnected`] unless the session is `Active`.
    /// Either way nothing reaches the log or the wire.
    pub fn send(&self, body: impl Into<String>) -> Result<(), ChatError> {
        self.dispatch(None, body.into())
    }

    /// Sends `body` to `room` without changing the selected room.
    ///
    /// # Errors
    /// Same as [`send`](Self::send).
    pub fn send_to(&self, room: RoomId, body: impl Into<String>) -> Result<(), ChatError> {
        self.dispatch(Some(room), body.into())
    }

    fn dispatch(&self, room: Option<RoomId>, body: String) -> Result<(), ChatError> {
        validate_body(&body)?;
        if !self.state().is_active() {
            return Err(SessionError::NotConnected.into());
        }
        self.commands
            .send(Command::Send { room, body })
            .map_err(|_| SessionError::NotConnected)?;
        Ok(())
    }

    /// Selects the room plain sends go to.
    ///
    /// # Errors
    /// [`SessionError::NotConnected`] once the session has ended.
    pub fn select_room(&self, room: RoomId) -> Result<(), ChatError> {
        self.commands
            .send(Command::SelectRoom(room))
            .map_err(|_| SessionError::NotConnected)?;
        Ok(())
    }

    /// Waits until the session is `Active` or has ended.
    ///
    /// Also returns if the session task stops without reporting why.
    ///
    /// # Errors
    /// Why the session ended before (or after) becoming active; see
    /// [`ConnectionManager::connect`].
    pub async fn wait_active(&self) -> Result<Identity, ChatError> {
        let mut snapshots = self.snapshots.subscribe();
        let mut alive = self.alive.clone();
        tokio::select! {
            _ = snapshots.wait_for(|s| s.state.is_active() || s.close_reason.is_some()) => {}
            // Nothing is ever sent on `alive`; this only returns on drop.
            _ = async { while alive.changed().await.is_ok() {} } => {}
        }

        let snapshot = self.snapshot();
        match (snapshot.identity, snapshot.close_reason) {
            (Some(identity), None) if snapshot.state.is_active() => Ok(identity),
            (_, Some(CloseReason::Rejected(reason))) => {
                Err(ChatError::AuthenticationRejected(reason))
            }
            (_, Some(CloseReason::TimedOut)) => {
                Err(ChatError::HandshakeTimeout(self.handshake_timeout))
            }
            (_, Some(CloseReason::Lost(reason))) => Err(ChatError::ConnectionLost(reason)),
            (_, Some(CloseReason::Requested)) => Err(SessionError::NotConnected.into()),
            (_, None) => Err(ChatError::ConnectionLost(
                "session task ended unexpectedly".into(),
            )),
        }
    }

    /// Closes the session and releases the transport.
    ///
    /// Safe to call any number of times and in any state, including after
    /// the connection failed. Always leaves the session `Disconnected`.
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // Err means the task already finished.
            let _ = shutdown.send(());
        }

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(self.close_timeout, &mut task)
                .await
                .is_err()
            {
                tracing::warn!(
                    tag = %self.session_tag,
                    "session task did not stop in time, aborting"
                );
                task.abort();
            }
        }

        self.snapshots.send_if_modified(|snapshot| {
            if snapshot.state == ConnectionState::Disconnected {
                return false;
            }
            *snapshot = SessionSnapshot {
                close_reason: Some(
                    snapshot
                        .close_reason
                        .take()
                        .unwrap_or(CloseReason::Requested),
                ),
                ..SessionSnapshot::default()
            };
            true
        });
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Generates a random 32-character hex tag (128 bits).
fn generate_session_tag() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_tag_is_32_hex_chars() {
        let tag = generate_session_tag();
        assert_eq!(tag.len(), 32);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_session_tag_is_unique() {
        assert_ne!(generate_session_tag(), generate_session_tag());
    }
}
