//! Transport abstraction layer for Parley.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! the persistent, bidirectional link a chat session runs on. The rest of
//! the client never touches a socket directly; it only sees these traits.
//!
//! # Implementations
//!
//! - [`WebSocketConnector`] / [`WebSocketConnection`]: real network
//!   connections via `tokio-tungstenite` (feature `websocket`, default).
//! - [`MemoryConnector`] / [`MemoryConnection`]: an in-process duplex
//!   pipe. Used by tests to play the server's role without a network.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`
//! - `tls`: enables `wss://` URLs (rustls with webpki roots)

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryConnector};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating process-unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique ID.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens outbound connections to a chat server.
///
/// The returned futures are `Send` so a session can be driven from a
/// spawned Tokio task regardless of which implementation is plugged in.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;
    /// The error type for connect failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens a connection to `url` (e.g. `ws://localhost:8080`).
    ///
    /// Resolves once the transport reports "open": the peer accepted the
    /// connection and frames can flow in both directions.
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single connection that can send text and receive frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one text frame to the remote peer.
    fn send_text(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next data frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed, including
    /// after a local [`close`](Connection::close).
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection. Calling it more than once is a no-op.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
