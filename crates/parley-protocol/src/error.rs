//! Error types for the protocol layer.
//!
//! Encoding and decoding fail in different ways and are handled
//! differently by callers, so they get separate types:
//!
//! - [`ProtocolError`]: building an outbound envelope went wrong. This
//!   indicates a bug or invalid input from the local side.
//! - [`DecodeError`]: an inbound frame could not be understood. This is
//!   expected in the wild (old servers, new servers, noise) and callers
//!   log and discard it rather than tearing the session down.

/// Errors raised while constructing or encoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an envelope into text).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A display name was empty or whitespace-only.
    #[error("identity must not be empty")]
    EmptyIdentity,
}

/// Why an inbound frame was not turned into an [`Envelope`](crate::Envelope).
///
/// Both variants are non-fatal: one bad frame must never end a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not well-formed structured text, has no `type`
    /// discriminant, or a known kind is missing required fields.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// The `type` discriminant names a kind this client doesn't know.
    #[error("unknown envelope kind {0:?}")]
    UnknownKind(String),
}
