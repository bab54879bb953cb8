//! Unified error type for the Parley client.

use std::time::Duration;

use parley_protocol::ProtocolError;
use parley_session::SessionError;
use parley_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `parley` facade you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
///
/// Local rejections (`NotConnected`, validation) arrive as
/// [`ChatError::Session`]; use [`ChatError::is_not_connected`] to test
/// for the common case.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (not connected, validation, auth).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server answered `login` with `success: false`.
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// No `login_response` arrived in time.
    #[error("no login response within {0:?}")]
    HandshakeTimeout(Duration),

    /// The transport failed or closed while the session was in use.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A page origin could not be parsed.
    #[error("invalid page origin {0:?}")]
    InvalidOrigin(String),
}

impl ChatError {
    /// Returns `true` for [`SessionError::NotConnected`].
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::Session(SessionError::NotConnected))
    }
}
