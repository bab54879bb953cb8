//! Codec trait and implementations for the envelope wire format.
//!
//! A "codec" (coder/decoder) converts between typed values and what goes
//! on the wire. The session layer doesn't care HOW envelopes are
//! serialized; it just needs something that implements [`Codec`].
//!
//! Currently we provide [`JsonCodec`], which speaks the JSON text format
//! the chat server and browser client use.

use crate::{DecodeError, Envelope, Intent, ProtocolError};

/// Encodes outbound intents and decodes inbound envelopes.
///
/// Implementations are stateless. `Send + Sync + 'static` lets one codec
/// value be shared by every session task in the process.
pub trait Codec: Send + Sync + 'static {
    /// Turns an outbound intent into the text of one wire frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] only if the serializer itself
    /// fails. Well-formed intents always encode.
    fn encode(&self, intent: &Intent) -> Result<String, ProtocolError>;

    /// Parses one inbound frame into an [`Envelope`].
    ///
    /// # Errors
    /// - [`DecodeError::Malformed`]: not structured text, no `type`
    ///   discriminant, or a known kind with missing/ill-typed fields.
    /// - [`DecodeError::UnknownKind`]: a well-formed record of a kind
    ///   this client doesn't know.
    fn decode(&self, raw: &[u8]) -> Result<Envelope, DecodeError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use parley_protocol::{Codec, Envelope, Identity, Intent, JsonCodec};
///
/// let codec = JsonCodec;
/// let identity = Identity::new("alice").unwrap();
///
/// let text = codec.encode(&Intent::Login { identity: identity.clone() }).unwrap();
/// assert_eq!(text, r#"{"type":"login","username":"alice"}"#);
///
/// let decoded = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(decoded, Envelope::Login { identity });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, intent: &Intent) -> Result<String, ProtocolError> {
        let envelope = Envelope::from(intent.clone());
        serde_json::to_string(&envelope).map_err(ProtocolError::Encode)
    }

    fn decode(&self, raw: &[u8]) -> Result<Envelope, DecodeError> {
        // Two passes: first into an untyped `Value` so we can tell
        // "unknown kind" apart from "broken record". Deserializing
        // straight into `Envelope` would report both as the same
        // serde error.
        let value: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                DecodeError::Malformed(
                    "missing string \"type\" discriminant".into(),
                )
            })?;
        if !Envelope::KINDS.contains(&kind) {
            return Err(DecodeError::UnknownKind(kind.to_owned()));
        }

        serde_json::from_value(value)
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}
