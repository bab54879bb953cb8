//! Wire protocol for Parley.
//!
//! This crate defines the "language" the chat client and server speak:
//!
//! - **Types** ([`Envelope`], [`Intent`], [`Identity`], [`RoomId`]):
//!   the records that travel on the persistent connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how outbound intents
//!   become text and how inbound text becomes envelopes.
//! - **Errors** ([`DecodeError`], [`ProtocolError`]): what can go wrong.
//! - **Account payloads** ([`LoginRequest`], [`RegisterRequest`],
//!   [`AccountResponse`]): the JSON bodies of the HTTP account endpoints
//!   that run before a persistent connection is opened.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and session
//! (identity, message log). It holds no state: every function here is
//! safe to call from any task at any time.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Session (message log)
//! ```

mod account;
mod codec;
mod error;
mod types;

pub use account::{
    AccountResponse, LoginRequest, RegisterRequest, WEB_CLIENT_TYPE,
};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{DecodeError, ProtocolError};
pub use types::{Envelope, Identity, Intent, RoomId};
