//! Optimistic-send reconciliation.
//!
//! When the user sends a message we show it right away, marked
//! provisional. The server later broadcasts the same message to everyone,
//! including us. Appending that echo blindly would show our own message
//! twice, so the [`Reconciler`] pairs each echo with the provisional entry
//! it confirms.
//!
//! # Matching
//!
//! The wire format has no slot for a client-side id, so the only
//! correlation key is `(room, body)`. Pending sends are kept in a FIFO
//! queue and an echo confirms the *oldest* pending entry with the same
//! key. Two identical sends in a row are confirmed in send order, which is
//! also the order the server relays them.
//!
//! ```text
//!   submit("hi")  ──→ log: [hi*]          pending: [c-1 hi]
//!   submit("hi")  ──→ log: [hi*, hi*]     pending: [c-1 hi, c-2 hi]
//!   echo("hi")    ──→ log: [hi,  hi*]     pending: [c-2 hi]
//!   echo("yo"@bob)──→ log: [hi,  hi*, yo] pending: [c-2 hi]
//! ```
//!
//! An echo that matches nothing is appended as a new confirmed entry. A
//! server-confirmed message is never dropped.
//!
//! # Overdue echoes
//!
//! A provisional entry with no echo after `echo_window` stays provisional
//! and stays matchable. [`Reconciler::sweep_overdue`] reports it once so
//! the caller can tell the user; nothing is removed. Only a transport
//! write failure removes a provisional entry ([`Reconciler::abandon`]).

use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime};

use parley_protocol::{Identity, RoomId};

use crate::{CorrelationId, Message, SessionError, SessionStore};

/// Rejects message bodies that are empty or only whitespace.
///
/// # Errors
/// [`SessionError::Validation`] for a blank body.
pub fn validate_body(body: &str) -> Result<(), SessionError> {
    if body.trim().is_empty() {
        return Err(SessionError::Validation(
            "message body must not be empty".into(),
        ));
    }
    Ok(())
}

/// What an inbound chat did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// It was our own echo; this provisional entry is now confirmed.
    Confirmed(CorrelationId),
    /// It was appended as a new confirmed entry.
    Appended(CorrelationId),
}

impl Reconciliation {
    /// The id of the log entry that was confirmed or appended.
    pub fn id(self) -> CorrelationId {
        match self {
            Self::Confirmed(id) | Self::Appended(id) => id,
        }
    }
}

#[derive(Debug)]
struct Pending {
    id: CorrelationId,
    room: RoomId,
    body: String,
    sent_at: Instant,
    overdue_reported: bool,
}

/// Pairs local sends with their server echoes.
///
/// One reconciler per session, driven from the same task that owns the
/// [`SessionStore`], so the search-then-mutate steps need no locking.
#[derive(Debug)]
pub struct Reconciler {
    next_id: u64,
    pending: VecDeque<Pending>,
    echo_window: Duration,
}

impl Reconciler {
    pub fn new(echo_window: Duration) -> Self {
        Self {
            next_id: 1,
            pending: VecDeque::new(),
            echo_window,
        }
    }

    /// Number of sends still waiting for their echo.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Validates a local send and inserts it as provisional.
    ///
    /// The entry is attributed to the store's identity and goes to the end
    /// of the log.
    ///
    /// # Errors
    /// - [`SessionError::Validation`]: blank body. Checked first, so an
    ///   empty send is a validation error in every state.
    /// - [`SessionError::NotConnected`]: the session is not `Active`.
    pub fn submit(
        &mut self,
        store: &mut SessionStore,
        room: RoomId,
        body: String,
        now: Instant,
    ) -> Result<CorrelationId, SessionError> {
        validate_body(&body)?;
        if !store.state().is_active() {
            return Err(SessionError::NotConnected);
        }
        let sender = store.identity().cloned().ok_or(SessionError::NotConnected)?;

        let id = self.allocate_id();
        store.append_message(Message {
            id,
            sender: Some(sender),
            body: body.clone(),
            room: room.clone(),
            observed_at: SystemTime::now(),
            provisional: true,
        });
        tracing::debug!(%id, %room, "provisional message inserted");

        self.pending.push_back(Pending {
            id,
            room,
            body,
            sent_at: now,
            overdue_reported: false,
        });
        Ok(id)
    }

    /// Applies one inbound chat message to the log.
    ///
    /// Our own echo confirms the oldest pending send with the same room and
    /// body. Anything else (other senders, no sender, or an echo with no
    /// pending match) is appended as confirmed.
    pub fn on_inbound(
        &mut self,
        store: &mut SessionStore,
        room: RoomId,
        body: String,
        sender: Option<Identity>,
    ) -> Reconciliation {
        let own = matches!(
            (store.identity(), sender.as_ref()),
            (Some(me), Some(from)) if me == from
        );

        if own {
            let matched = self
                .pending
                .iter()
                .position(|p| p.room == room && p.body == body)
                .and_then(|index| self.pending.remove(index));
            if let Some(pending) = matched {
                if store.mark_confirmed(pending.id) {
                    tracing::debug!(id = %pending.id, %room, "echo confirmed");
                    return Reconciliation::Confirmed(pending.id);
                }
            }
        }

        let id = self.allocate_id();
        tracing::debug!(
            %id,
            %room,
            sender = sender.as_ref().map_or("<unknown>", Identity::as_str),
            "message appended"
        );
        store.append_message(Message {
            id,
            sender,
            body,
            room,
            observed_at: SystemTime::now(),
            provisional: false,
        });
        Reconciliation::Appended(id)
    }

    /// Drops a provisional entry whose write to the transport failed.
    ///
    /// Returns `false` if `id` was not pending.
    pub fn abandon(&mut self, store: &mut SessionStore, id: CorrelationId) -> bool {
        let Some(index) = self.pending.iter().position(|p| p.id == id) else {
            return false;
        };
        self.pending.remove(index);
        let removed = store.remove_provisional(id);
        tracing::debug!(%id, "provisional message abandoned");
        removed
    }

    /// Returns the pending sends that crossed the echo window since the
    /// last sweep. Each id is reported at most once.
    pub fn sweep_overdue(&mut self, now: Instant) -> Vec<CorrelationId> {
        let mut overdue = Vec::new();
        for pending in &mut self.pending {
            if pending.overdue_reported {
                continue;
            }
            if now.saturating_duration_since(pending.sent_at) >= self.echo_window {
                pending.overdue_reported = true;
                overdue.push(pending.id);
            }
        }
        overdue
    }

    /// Forgets every pending send. Ids keep counting up.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    fn allocate_id(&mut self) -> CorrelationId {
        let id = CorrelationId::new(self.next_id);
        self.next_id += 1;
        id
    }
}
