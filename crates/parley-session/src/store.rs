//! The authoritative local view of one chat session.
//!
//! [`SessionStore`] holds who we are, which room is selected, where the
//! connection is, and the ordered message log. It is owned by exactly one
//! task; everyone else reads it through a [`SessionSnapshot`].
//!
//! # Snapshots
//!
//! The log lives in an `Arc<Vec<Message>>`. Taking a snapshot clones the
//! `Arc` (a pointer copy), and every mutation goes through
//! [`Arc::make_mut`], which copies the vector only if a snapshot is still
//! holding the old one. A reader therefore never sees a half-applied
//! change: it either has the log from before a mutation or after it.

use std::sync::Arc;

use parley_protocol::{Identity, RoomId};

use crate::{CloseReason, ConnectionState, CorrelationId, Message, SessionError};

/// Immutable view of a [`SessionStore`] at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub identity: Option<Identity>,
    pub room: RoomId,
    /// Log entries in the order they were processed.
    pub messages: Arc<Vec<Message>>,
    /// Set once the session has left the live states.
    pub close_reason: Option<CloseReason>,
}

impl SessionSnapshot {
    /// Number of entries still waiting for their server echo.
    pub fn provisional_count(&self) -> usize {
        self.messages.iter().filter(|m| m.provisional).count()
    }
}

/// Owns the session's state and message log.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: ConnectionState,
    identity: Option<Identity>,
    room: RoomId,
    messages: Arc<Vec<Message>>,
    close_reason: Option<CloseReason>,
}

impl SessionStore {
    /// Creates an empty, disconnected store on the global room.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Moves to `Active` and records who we are.
    ///
    /// Allowed from `Disconnected`, `Connecting`, or
    /// `AwaitingLoginResponse`. Clears any earlier close reason.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] from any other state.
    pub fn activate(&mut self, identity: Identity) -> Result<(), SessionError> {
        use ConnectionState::*;
        if !matches!(self.state, Disconnected | Connecting | AwaitingLoginResponse)
        {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: Active,
            });
        }

        tracing::info!(%identity, from = %self.state, "session active");
        self.state = Active;
        self.identity = Some(identity);
        self.close_reason = None;
        Ok(())
    }

    /// Moves the connection to `to`, enforcing the lifecycle.
    ///
    /// Setting the current state again is a no-op.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] if the lifecycle forbids the move.
    pub fn set_state(&mut self, to: ConnectionState) -> Result<(), SessionError> {
        if self.state == to {
            return Ok(());
        }
        if !self.state.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        tracing::debug!(from = %self.state, %to, "connection state changed");
        self.state = to;
        Ok(())
    }

    /// Selects the room that plain sends go to.
    pub fn select_room(&mut self, room: RoomId) {
        self.room = room;
    }

    /// Remembers why the session ended.
    pub fn record_close(&mut self, reason: CloseReason) {
        self.close_reason = Some(reason);
    }

    /// Clears identity, room, and the log. Used on logout and on loss.
    ///
    /// The connection state is left alone; the caller moves it.
    pub fn reset(&mut self) {
        self.identity = None;
        self.room = RoomId::global();
        self.messages = Arc::new(Vec::new());
    }

    /// Takes an immutable snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            identity: self.identity.clone(),
            room: self.room.clone(),
            messages: Arc::clone(&self.messages),
            close_reason: self.close_reason.clone(),
        }
    }

    // -- Log mutation (reconciler only) ------------------------------------

    pub(crate) fn append_message(&mut self, message: Message) {
        Arc::make_mut(&mut self.messages).push(message);
    }

    /// Flips a provisional entry to confirmed, in place.
    ///
    /// Returns `false` if no provisional entry has that id.
    pub(crate) fn mark_confirmed(&mut self, id: CorrelationId) -> bool {
        let Some(index) = self.provisional_index(id) else {
            return false;
        };
        Arc::make_mut(&mut self.messages)[index].provisional = false;
        true
    }

    /// Removes a provisional entry. Confirmed entries are never removed.
    pub(crate) fn remove_provisional(&mut self, id: CorrelationId) -> bool {
        let Some(index) = self.provisional_index(id) else {
            return false;
        };
        Arc::make_mut(&mut self.messages).remove(index);
        true
    }

    fn provisional_index(&self, id: CorrelationId) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| m.id == id && m.provisional)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn alice() -> Identity {
        Identity::new("alice").unwrap()
    }

    fn entry(id: u64, body: &str, provisional: bool) -> Message {
        Message {
            id: CorrelationId::new(id),
            sender: Some(alice()),
            body: body.into(),
            room: RoomId::global(),
            observed_at: SystemTime::now(),
            provisional,
        }
    }

    #[test]
    fn test_new_store_is_disconnected_and_empty() {
        let store = SessionStore::new();

        assert_eq!(store.state(), ConnectionState::Disconnected);
        assert!(store.identity().is_none());
        assert!(store.room().is_global());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_activate_from_awaiting_sets_identity() {
        let mut store = SessionStore::new();
        store.set_state(ConnectionState::Connecting).unwrap();
        store
            .set_state(ConnectionState::AwaitingLoginResponse)
            .unwrap();

        store.activate(alice()).unwrap();

        assert_eq!(store.state(), ConnectionState::Active);
        assert_eq!(store.identity(), Some(&alice()));
    }

    #[test]
    fn test_activate_from_failed_is_rejected() {
        let mut store = SessionStore::new();
        store.set_state(ConnectionState::Connecting).unwrap();
        store.set_state(ConnectionState::Failed).unwrap();

        let err = store.activate(alice()).unwrap_err();

        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: ConnectionState::Failed,
                to: ConnectionState::Active,
            }
        );
        assert!(store.identity().is_none());
    }

    #[test]
    fn test_activate_clears_previous_close_reason() {
        let mut store = SessionStore::new();
        store.record_close(CloseReason::TimedOut);

        store.activate(alice()).unwrap();

        assert!(store.close_reason().is_none());
    }

    #[test]
    fn test_set_state_rejects_invalid_transition() {
        let mut store = SessionStore::new();

        let result = store.set_state(ConnectionState::Closing);

        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition { .. })
        ));
        assert_eq!(store.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_set_state_same_state_is_noop() {
        let mut store = SessionStore::new();
        assert!(store.set_state(ConnectionState::Disconnected).is_ok());
    }

    #[test]
    fn test_mark_confirmed_keeps_position() {
        let mut store = SessionStore::new();
        store.append_message(entry(1, "a", true));
        store.append_message(entry(2, "b", false));

        assert!(store.mark_confirmed(CorrelationId::new(1)));

        let bodies: Vec<_> =
            store.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["a", "b"]);
        assert!(!store.messages()[0].provisional);
    }

    #[test]
    fn test_mark_confirmed_unknown_or_confirmed_returns_false() {
        let mut store = SessionStore::new();
        store.append_message(entry(1, "a", false));

        assert!(!store.mark_confirmed(CorrelationId::new(1)));
        assert!(!store.mark_confirmed(CorrelationId::new(9)));
    }

    #[test]
    fn test_remove_provisional_leaves_confirmed_entries() {
        let mut store = SessionStore::new();
        store.append_message(entry(1, "a", false));
        store.append_message(entry(2, "b", true));

        assert!(!store.remove_provisional(CorrelationId::new(1)));
        assert!(store.remove_provisional(CorrelationId::new(2)));
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_mutation() {
        let mut store = SessionStore::new();
        store.append_message(entry(1, "a", true));
        let before = store.snapshot();

        store.mark_confirmed(CorrelationId::new(1));
        store.append_message(entry(2, "b", false));

        assert_eq!(before.messages.len(), 1);
        assert!(before.messages[0].provisional);
        assert_eq!(before.provisional_count(), 1);
        assert_eq!(store.snapshot().messages.len(), 2);
    }

    #[test]
    fn test_reset_clears_identity_room_and_log() {
        let mut store = SessionStore::new();
        store.activate(alice()).unwrap();
        store.select_room(RoomId::new("rust"));
        store.append_message(entry(1, "a", false));

        store.reset();

        assert!(store.identity().is_none());
        assert!(store.room().is_global());
        assert!(store.messages().is_empty());
        assert_eq!(store.state(), ConnectionState::Active);
    }
}
