//! Error types for the session layer.

use crate::ConnectionState;

/// Errors that can occur while managing a chat session.
///
/// Everything here is rejected locally: none of these variants means a
/// frame was written to the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A send was attempted while the session is not `Active`.
    /// The message never enters the log.
    #[error("not connected")]
    NotConnected,

    /// Local input failed validation (e.g. an empty message body).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The account service refused the credentials, or returned an error.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A lifecycle transition the state machine doesn't allow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}
