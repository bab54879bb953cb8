//! Which screen the presentation layer should show.
//!
//! ```text
//!   LoggedOut ──(connect)──→ Authenticating ──(accepted)──→ Active
//!       ↑                          │                        │   ↑
//!       └──(rejected / lost)───────┘        (open_settings) │   │ (close_settings)
//!       ↑                                                   ↓   │
//!       └──────────────(lost / logout)─────────────── SettingsOverlay
//! ```
//!
//! The screen follows [`ConnectionState`]. The only state the UI adds on
//! its own is the settings overlay, and even that collapses to
//! `LoggedOut` as soon as the connection leaves `Active`.

use parley_session::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    LoggedOut,
    Authenticating,
    Active,
    SettingsOverlay,
}

impl ViewState {
    /// The screen for a connection state, ignoring any overlay.
    pub fn for_connection(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connecting | ConnectionState::AwaitingLoginResponse => {
                Self::Authenticating
            }
            ConnectionState::Active => Self::Active,
            ConnectionState::Disconnected
            | ConnectionState::Closing
            | ConnectionState::Failed => Self::LoggedOut,
        }
    }

    /// Follows a connection state change. The settings overlay survives
    /// only while the connection stays `Active`.
    pub fn on_connection(self, state: ConnectionState) -> Self {
        match (self, state) {
            (Self::SettingsOverlay, ConnectionState::Active) => Self::SettingsOverlay,
            _ => Self::for_connection(state),
        }
    }

    /// Opens the settings overlay. Only possible from `Active`.
    pub fn open_settings(self) -> Self {
        match self {
            Self::Active => Self::SettingsOverlay,
            other => other,
        }
    }

    pub fn close_settings(self) -> Self {
        match self {
            Self::SettingsOverlay => Self::Active,
            other => other,
        }
    }

    /// `true` on the chat screen or the overlay above it.
    pub fn is_signed_in(self) -> bool {
        matches!(self, Self::Active | Self::SettingsOverlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follows_connection_through_login() {
        let mut view = ViewState::default();
        for (state, expected) in [
            (ConnectionState::Connecting, ViewState::Authenticating),
            (ConnectionState::AwaitingLoginResponse, ViewState::Authenticating),
            (ConnectionState::Active, ViewState::Active),
        ] {
            view = view.on_connection(state);
            assert_eq!(view, expected);
        }
    }

    #[test]
    fn test_rejected_login_returns_to_logged_out() {
        let view = ViewState::Authenticating.on_connection(ConnectionState::Disconnected);
        assert_eq!(view, ViewState::LoggedOut);
    }

    #[test]
    fn test_settings_overlay_round_trip() {
        let view = ViewState::Active.open_settings();
        assert_eq!(view, ViewState::SettingsOverlay);
        assert!(view.is_signed_in());
        assert_eq!(view.close_settings(), ViewState::Active);
    }

    #[test]
    fn test_settings_cannot_open_while_logged_out() {
        assert_eq!(ViewState::LoggedOut.open_settings(), ViewState::LoggedOut);
        assert_eq!(
            ViewState::Authenticating.open_settings(),
            ViewState::Authenticating
        );
    }

    #[test]
    fn test_overlay_survives_active_updates() {
        let view = ViewState::SettingsOverlay.on_connection(ConnectionState::Active);
        assert_eq!(view, ViewState::SettingsOverlay);
    }

    #[test]
    fn test_connection_loss_closes_overlay() {
        let view = ViewState::SettingsOverlay.on_connection(ConnectionState::Failed);
        assert_eq!(view, ViewState::LoggedOut);
        assert!(!view.is_signed_in());
    }
}
