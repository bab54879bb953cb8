//! # Parley
//!
//! Realtime chat client core: an authenticated persistent connection, the
//! JSON envelope protocol, and a local message log that shows every
//! message exactly once even though our own messages are displayed before
//! the server echoes them back.
//!
//! Presentation (rendering, forms, settings screens) is not part of this
//! crate. It drives a [`SessionHandle`] and renders the
//! [`SessionSnapshot`]s and [`SessionEvent`]s the handle exposes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn run() -> Result<(), ChatError> {
//! let manager = ConnectionManager::new(WebSocketConnector);
//! let endpoint = FixedEndpoint::new("ws://localhost:8080");
//!
//! let (mut session, mut events) =
//!     manager.connect(&endpoint, Identity::new("alice")?).await?;
//! session.send("hi")?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::MessageConfirmed(_) = event {
//!         break;
//!     }
//! }
//! session.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `tls`: enables `wss://` endpoints

mod actor;
mod config;
mod connection;
mod endpoint;
mod error;
mod view;

pub use config::ClientConfig;
pub use connection::{ConnectionManager, SessionEvent, SessionHandle};
pub use endpoint::{EndpointResolver, FixedEndpoint, PageOrigin};
pub use error::ChatError;
pub use view::ViewState;

pub use parley_protocol::{Identity, RoomId};
pub use parley_session::{
    AccountService, CloseReason, ConnectionState, CorrelationId, Credentials,
    Message, SessionError, SessionSnapshot,
};

/// Everything needed to open and drive a session.
pub mod prelude {
    pub use crate::{
        AccountService, ChatError, ClientConfig, CloseReason, ConnectionManager,
        ConnectionState, CorrelationId, Credentials, EndpointResolver,
        FixedEndpoint, Identity, Message, PageOrigin, RoomId, SessionError,
        SessionEvent, SessionHandle, SessionSnapshot, ViewState,
    };
    pub use parley_transport::{
        Connector, MemoryConnection, MemoryConnector, WebSocketConnector,
    };
}
