//! Message log entries.

use std::fmt;
use std::time::SystemTime;

use parley_protocol::{Identity, RoomId};

/// Local identifier attached to every log entry.
///
/// Assigned by the [`Reconciler`](crate::Reconciler) from a per-session
/// counter. It never crosses the wire; the server has no idea it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wraps a raw counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c-{}", self.0)
    }
}

/// One entry in the session's message log.
///
/// Entries are created and mutated only by the reconciler. The
/// presentation layer reads them through a
/// [`SessionSnapshot`](crate::SessionSnapshot) and never changes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: CorrelationId,
    /// Who wrote it. `None` when the server broadcast a chat without a
    /// `username`.
    pub sender: Option<Identity>,
    pub body: String,
    pub room: RoomId,
    /// Wall-clock time this client first saw the message. Informational
    /// only; the log is never sorted by it.
    pub observed_at: SystemTime,
    /// `true` while a locally sent message waits for the server's echo.
    pub provisional: bool,
}
