//! Session state and message synchronization for Parley.
//!
//! This crate is the client's local view of a chat session:
//!
//! 1. **State**: where the connection is in its lifecycle
//!    ([`ConnectionState`]) and why it ended ([`CloseReason`])
//! 2. **Store**: who we are, which room is selected, and the ordered
//!    message log ([`SessionStore`], read through [`SessionSnapshot`])
//! 3. **Reconciliation**: making sure a message we display optimistically
//!    and then receive back from the server shows up exactly once
//!    ([`Reconciler`])
//! 4. **Accounts**: the seam to the HTTP account service that runs before
//!    a session exists ([`AccountService`])
//!
//! Nothing in here performs I/O. The connection layer above drives these
//! types from a single task, one event at a time.
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection layer (above)  ← owns the transport, feeds events in order
//!     ↕
//! Session layer (this crate)  ← identity, message log, reconciliation
//!     ↕
//! Protocol layer (below)  ← provides Identity, RoomId, Envelope
//! ```

mod auth;
mod error;
mod message;
mod reconcile;
mod state;
mod store;

pub use auth::{AccountService, Credentials, validate_credentials};
pub use error::SessionError;
pub use message::{CorrelationId, Message};
pub use reconcile::{Reconciler, Reconciliation, validate_body};
pub use state::{CloseReason, ConnectionState};
pub use store::{SessionSnapshot, SessionStore};
