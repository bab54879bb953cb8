//! Core protocol types for Parley's wire format.
//!
//! This module defines every type that travels on the persistent
//! connection. The JSON shapes are fixed by the server and by the browser
//! client that shares it, so the serde attributes here are load-bearing:
//! renaming a field means breaking interop.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A user's display name, chosen at login.
///
/// Newtype over `String` so an identity can't be confused with a message
/// body or a room name in a function signature. Construction enforces the
/// one invariant the protocol has for names: they are not blank.
///
/// `#[serde(try_from = "String")]` routes deserialization through
/// [`TryFrom<String>`], so an empty `"username"` on the wire is rejected
/// the same way [`Identity::new`] rejects it in code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Creates an identity from a display name.
    ///
    /// The name is kept verbatim (no trimming); it only has to contain
    /// something other than whitespace.
    ///
    /// # Errors
    /// Returns [`ProtocolError::EmptyIdentity`] for blank names.
    pub fn new(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProtocolError::EmptyIdentity);
        }
        Ok(Self(name))
    }

    /// Returns the display name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque room identifier.
///
/// The empty string is the default/global room. That is what the wire
/// carries when a message is addressed to "everyone".
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room identifier. An empty string means the global room.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The default/global room.
    pub fn global() -> Self {
        Self(String::new())
    }

    /// Returns `true` for the default/global room.
    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            f.write_str("global")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Reads an optional `username` field leniently.
///
/// Servers sometimes send `""` or `null` where they mean "no name"
/// (e.g. on a rejected login). Both decode as `None` instead of failing
/// the whole envelope.
fn optional_identity<'de, D>(de: D) -> Result<Option<Identity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|name| Identity::new(name).ok()))
}

// ---------------------------------------------------------------------------
// Envelope: the unit of wire exchange
// ---------------------------------------------------------------------------

/// One discrete record on the persistent connection.
///
/// `#[serde(tag = "type")]` produces "internally tagged" JSON: the kind
/// lives next to the payload fields:
///
/// ```text
/// {"type":"login","username":"alice"}
/// {"type":"login_response","success":true,"username":"alice"}
/// {"type":"message","content":"hi","room_id":"","username":"alice"}
/// ```
///
/// Rust field names follow the client's vocabulary (`identity`, `body`,
/// `room`); `#[serde(rename)]` maps them onto the wire names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Client → Server: "This is who I am." Sent once per connection.
    Login {
        #[serde(rename = "username")]
        identity: Identity,
    },

    /// Server → Client: the answer to `Login`. Terminal for the handshake.
    LoginResponse {
        #[serde(rename = "success")]
        accepted: bool,
        #[serde(
            rename = "username",
            default,
            deserialize_with = "optional_identity",
            skip_serializing_if = "Option::is_none"
        )]
        identity: Option<Identity>,
    },

    /// Either direction: a chat message.
    ///
    /// The client leaves `sender` empty; the server fills it with the
    /// authoritative author when broadcasting. A missing `room_id` is read
    /// as the global room.
    #[serde(rename = "message")]
    Chat {
        #[serde(rename = "content")]
        body: String,
        #[serde(rename = "room_id", default)]
        room: RoomId,
        #[serde(
            rename = "username",
            default,
            deserialize_with = "optional_identity",
            skip_serializing_if = "Option::is_none"
        )]
        sender: Option<Identity>,
    },
}

impl Envelope {
    /// Every `type` discriminant this client understands.
    pub const KINDS: [&'static str; 3] = ["login", "login_response", "message"];

    /// Returns this envelope's wire discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::LoginResponse { .. } => "login_response",
            Self::Chat { .. } => "message",
        }
    }
}

// ---------------------------------------------------------------------------
// Intent: what the local side wants to say
// ---------------------------------------------------------------------------

/// A typed outbound request, before it becomes an [`Envelope`].
///
/// Intents only cover what a client may originate. There is no way to
/// build an outbound chat with a sender filled in; the server decides who
/// the author is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Open the handshake as `identity`.
    Login { identity: Identity },
    /// Post `body` to `room`.
    Chat { room: RoomId, body: String },
}

impl From<Intent> for Envelope {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Login { identity } => Envelope::Login { identity },
            Intent::Chat { room, body } => Envelope::Chat {
                body,
                room,
                sender: None,
            },
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
