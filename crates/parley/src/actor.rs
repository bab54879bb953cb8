//! Per-session task: connect, handshake, relay, close.
//!
//! Each session runs in its own Tokio task and is the only code that
//! touches its transport and its [`SessionStore`]. Everything that can
//! happen to a session (an inbound frame, a command from the handle, the
//! handshake deadline, the overdue sweep, shutdown) is a branch of one
//! `tokio::select!` loop, so events are applied one at a time in the
//! order they are picked up.
//!
//! The flow is:
//!   1. Open the transport (bounded by the handshake deadline)
//!   2. Send `login`, wait for `login_response`
//!   3. Loop: apply inbound chat, write outbound chat, sweep overdue echoes
//!   4. On any exit: release the transport, publish the final state, and
//!      deliver `Closed`

use std::sync::Arc;
use std::time::Duration;

use parley_protocol::{Codec, Envelope, Identity, Intent, RoomId};
use parley_session::{
    CloseReason, ConnectionState, Reconciler, Reconciliation, SessionError,
    SessionSnapshot, SessionStore,
};
use parley_transport::{Connection, Connector};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::{ChatError, ClientConfig, SessionEvent};

/// Shortest interval between overdue sweeps.
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(50);

/// Requests from a [`SessionHandle`](crate::SessionHandle) to its task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Send `body`. `None` means the currently selected room.
    Send { room: Option<RoomId>, body: String },
    SelectRoom(RoomId),
}

/// Everything a session task needs, assembled by the connection manager.
pub(crate) struct SessionTask<K, D> {
    pub(crate) connector: Arc<K>,
    pub(crate) codec: Arc<D>,
    pub(crate) config: ClientConfig,
    pub(crate) url: String,
    pub(crate) identity: Identity,
    pub(crate) snapshots: Arc<watch::Sender<SessionSnapshot>>,
    pub(crate) events: mpsc::Sender<SessionEvent>,
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
    pub(crate) shutdown: oneshot::Receiver<()>,
    /// Dropped with the task, however it ends.
    pub(crate) alive: watch::Sender<()>,
}

impl<K, D> SessionTask<K, D>
where
    K: Connector,
    D: Codec,
{
    /// Runs the session from connect to close.
    pub(crate) async fn run(self) {
        let SessionTask {
            connector,
            codec,
            config,
            url,
            identity,
            snapshots,
            events,
            commands,
            mut shutdown,
            alive: _alive,
        } = self;

        let deadline = handshake_deadline(Instant::now(), config.handshake_timeout);
        let mut state = SessionState {
            store: SessionStore::new(),
            reconciler: Reconciler::new(config.echo_window),
            snapshots,
            events,
        };
        state.transition(ConnectionState::Connecting);

        tracing::debug!(%url, "connecting");
        let conn = tokio::select! {
            result = connector.connect(&url) => match result {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::info!(%url, error = %e, "connect failed");
                    return state.conclude(CloseReason::Lost(e.to_string())).await;
                }
            },
            _ = sleep_until(deadline) => {
                return state.conclude(CloseReason::TimedOut).await;
            }
            _ = &mut shutdown => {
                return state.conclude(CloseReason::Requested).await;
            }
        };
        tracing::info!(conn_id = %conn.id(), %url, "transport open");

        let actor = SessionActor {
            state,
            conn,
            codec,
            requested: identity,
            commands,
            sweep_period: (config.echo_window / 2).max(MIN_SWEEP_PERIOD),
        };
        actor.run(shutdown, deadline).await;
    }
}

/// `None` when the timeout is too large to represent: no deadline at all.
fn handshake_deadline(now: Instant, timeout: Duration) -> Option<Instant> {
    now.checked_add(timeout)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The store plus the channels it is published on.
///
/// Split from the actor so the connect phase, which has no transport yet,
/// can report and conclude the same way.
struct SessionState {
    store: SessionStore,
    reconciler: Reconciler,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionState {
    fn publish(&self) {
        self.snapshots.send_replace(self.store.snapshot());
    }

    fn transition(&mut self, to: ConnectionState) {
        if let Err(e) = self.store.set_state(to) {
            tracing::warn!(error = %e, "ignoring state change");
        }
        self.publish();
    }

    /// Delivers an event without waiting. A full channel drops it.
    fn emit(&self, event: SessionEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(?event, "event channel full, dropping event");
            }
            // Nobody is listening. Not an error.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Leaves the live states for good.
    ///
    /// A lost connection ends in `Failed` and stays there until the handle
    /// is closed; every other reason ends in `Disconnected`. Identity,
    /// room, and the log are discarded either way.
    async fn conclude(mut self, reason: CloseReason) {
        match reason {
            CloseReason::Lost(_) => self.transition(ConnectionState::Failed),
            _ => {
                self.transition(ConnectionState::Closing);
                self.transition(ConnectionState::Disconnected);
            }
        }
        self.reconciler.reset();
        self.store.reset();
        self.store.record_close(reason.clone());
        self.publish();

        match &reason {
            CloseReason::Rejected(_) | CloseReason::TimedOut => {
                tracing::warn!(%reason, "session closed");
            }
            _ => tracing::info!(%reason, "session closed"),
        }

        // The final event waits for room in the channel.
        let _ = self.events.send(SessionEvent::Closed(reason)).await;
    }
}

/// The connected part of a session.
struct SessionActor<C, D> {
    state: SessionState,
    conn: C,
    codec: Arc<D>,
    /// The identity sent in `login`.
    requested: Identity,
    commands: mpsc::UnboundedReceiver<Command>,
    sweep_period: Duration,
}

impl<C, D> SessionActor<C, D>
where
    C: Connection,
    D: Codec,
{
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>, deadline: Option<Instant>) {
        let login = Intent::Login {
            identity: self.requested.clone(),
        };
        if let Err(e) = self.write(&login).await {
            return self.close(CloseReason::Lost(e.to_string())).await;
        }
        self.state.transition(ConnectionState::AwaitingLoginResponse);
        tracing::debug!(identity = %self.requested, "login sent");

        let handshake = sleep_until(deadline);
        tokio::pin!(handshake);
        let mut sweep = tokio::time::interval(self.sweep_period);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let reason = loop {
            let active = self.state.store.state().is_active();
            tokio::select! {
                _ = &mut shutdown => break CloseReason::Requested,

                _ = &mut handshake, if !active => break CloseReason::TimedOut,

                frame = self.conn.recv() => match frame {
                    Ok(Some(raw)) => {
                        if let Some(reason) = self.on_frame(&raw) {
                            break reason;
                        }
                    }
                    Ok(None) => break CloseReason::Lost("closed by server".into()),
                    Err(e) => break CloseReason::Lost(e.to_string()),
                },

                Some(command) = self.commands.recv() => self.on_command(command).await,

                _ = sweep.tick(), if active => self.sweep(),
            }
        };

        self.close(reason).await;
    }

    /// Releases the transport, then concludes the session.
    async fn close(mut self, reason: CloseReason) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "transport close failed");
        }
        self.reject_queued();
        self.state.conclude(reason).await;
    }

    /// Fails sends the handle queued after the loop stopped reading.
    ///
    /// Closing the receiver first makes later handle sends fail right away.
    fn reject_queued(&mut self) {
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Send { .. } = command {
                self.state.emit(SessionEvent::SendFailed {
                    id: None,
                    reason: SessionError::NotConnected.to_string(),
                });
            }
        }
    }

    async fn write(&self, intent: &Intent) -> Result<(), ChatError> {
        let text = self.codec.encode(intent)?;
        self.conn
            .send_text(&text)
            .await
            .map_err(|e| ChatError::ConnectionLost(e.to_string()))
    }

    /// Handles one inbound frame. Returns a reason if the session must end.
    fn on_frame(&mut self, raw: &[u8]) -> Option<CloseReason> {
        let envelope = match self.codec.decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "discarding inbound frame");
                return None;
            }
        };

        match envelope {
            Envelope::LoginResponse { accepted, identity } => {
                self.on_login_response(accepted, identity)
            }
            Envelope::Chat { body, room, sender } => {
                self.on_chat(room, body, sender);
                None
            }
            Envelope::Login { .. } => {
                tracing::debug!("ignoring login envelope from server");
                None
            }
        }
    }

    fn on_login_response(
        &mut self,
        accepted: bool,
        identity: Option<Identity>,
    ) -> Option<CloseReason> {
        if self.state.store.state().is_active() {
            tracing::debug!("ignoring repeated login_response");
            return None;
        }
        if !accepted {
            return Some(CloseReason::Rejected("login refused by server".into()));
        }

        // The server's spelling of the name wins when it sends one.
        let identity = identity.unwrap_or_else(|| self.requested.clone());
        if let Err(e) = self.state.store.activate(identity.clone()) {
            tracing::warn!(error = %e, "could not activate session");
            return None;
        }
        self.state.publish();
        self.state.emit(SessionEvent::Activated(identity));
        None
    }

    fn on_chat(&mut self, room: RoomId, body: String, sender: Option<Identity>) {
        if !self.state.store.state().is_active() {
            tracing::debug!(%room, "dropping chat received before activation");
            return;
        }

        let outcome =
            self.state
                .reconciler
                .on_inbound(&mut self.state.store, room, body, sender);
        self.state.publish();
        tracing::trace!(id = %outcome.id(), "chat applied");

        match outcome {
            Reconciliation::Confirmed(id) => {
                self.state.emit(SessionEvent::MessageConfirmed(id));
            }
            Reconciliation::Appended(_) => {
                if let Some(message) = self.state.store.messages().last() {
                    self.state.emit(SessionEvent::MessageAppended(message.clone()));
                }
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Send { room, body } => self.on_send(room, body).await,
            Command::SelectRoom(room) => {
                tracing::debug!(%room, "room selected");
                self.state.store.select_room(room);
                self.state.publish();
            }
        }
    }

    async fn on_send(&mut self, room: Option<RoomId>, body: String) {
        let room = room.unwrap_or_else(|| self.state.store.room().clone());
        let submitted = self.state.reconciler.submit(
            &mut self.state.store,
            room.clone(),
            body.clone(),
            Instant::now().into_std(),
        );

        // The handle checked this too, but the state may have moved since.
        let id = match submitted {
            Ok(id) => id,
            Err(e) => {
                self.state.emit(SessionEvent::SendFailed {
                    id: None,
                    reason: e.to_string(),
                });
                return;
            }
        };
        self.state.publish();
        if let Some(message) = self.state.store.messages().last() {
            self.state.emit(SessionEvent::MessageAppended(message.clone()));
        }

        if let Err(e) = self.write(&Intent::Chat { room, body }).await {
            tracing::debug!(%id, error = %e, "chat write failed");
            self.state.reconciler.abandon(&mut self.state.store, id);
            self.state.publish();
            self.state.emit(SessionEvent::SendFailed {
                id: Some(id),
                reason: e.to_string(),
            });
        }
    }

    fn sweep(&mut self) {
        let overdue = self
            .state
            .reconciler
            .sweep_overdue(Instant::now().into_std());
        for id in overdue {
            tracing::warn!(%id, "no echo for provisional message");
            self.state.emit(SessionEvent::EchoOverdue(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_deadline_adds_timeout() {
        let now = Instant::now();
        assert_eq!(
            handshake_deadline(now, Duration::from_secs(10)),
            Some(now + Duration::from_secs(10))
        );
    }

    #[test]
    fn test_handshake_deadline_overflow_is_unbounded() {
        assert_eq!(handshake_deadline(Instant::now(), Duration::MAX), None);
    }
}
