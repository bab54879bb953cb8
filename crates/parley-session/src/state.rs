//! Connection lifecycle state machine.

use std::fmt;

/// Where a session's connection is in its lifecycle.
///
/// ```text
///   Disconnected ──→ Connecting ──→ AwaitingLoginResponse ──→ Active
///        ↑                                                      │
///        └──────────────── Closing ←────────────────────────────┘
///
///   Connecting / AwaitingLoginResponse / Active / Closing ──(error)──→ Failed
///   Failed ──(close)──→ Disconnected
/// ```
///
/// - **Disconnected**: no transport. The starting and the final state.
/// - **Connecting**: the transport is being opened.
/// - **AwaitingLoginResponse**: `login` was sent; waiting for the answer.
/// - **Active**: the server accepted us. Sends are allowed.
/// - **Closing**: the transport is being released.
/// - **Failed**: the transport errored or dropped. The caller has to
///   close explicitly to get back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingLoginResponse,
    Active,
    Closing,
    Failed,
}

impl ConnectionState {
    /// Returns `true` only for `Active`, the one state that allows sends.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` when no transport is in use (`Disconnected`/`Failed`).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    /// Returns `true` if moving from `self` to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        use ConnectionState::*;
        match (self, target) {
            (Disconnected, Connecting)
            | (Connecting, AwaitingLoginResponse)
            | (AwaitingLoginResponse, Active)
            | (Failed, Disconnected)
            | (Closing, Disconnected) => true,
            // Any live state may start closing or fail.
            (Connecting | AwaitingLoginResponse | Active, Closing) => true,
            (Connecting | AwaitingLoginResponse | Active | Closing, Failed) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingLoginResponse => write!(f, "AwaitingLoginResponse"),
            Self::Active => write!(f, "Active"),
            Self::Closing => write!(f, "Closing"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Why a session left the live states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The caller closed the session (logout).
    Requested,
    /// The server answered `login` with `success: false`.
    Rejected(String),
    /// No `login_response` arrived within the handshake timeout.
    TimedOut,
    /// The transport failed or was closed by the peer.
    Lost(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "closed by client"),
            Self::Rejected(reason) => write!(f, "login rejected: {reason}"),
            Self::TimedOut => write!(f, "login handshake timed out"),
            Self::Lost(reason) => write!(f, "connection lost: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_happy_path_transitions_are_allowed() {
        let path = [
            Disconnected,
            Connecting,
            AwaitingLoginResponse,
            Active,
            Closing,
            Disconnected,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_failed_reachable_from_every_live_state() {
        for from in [Connecting, AwaitingLoginResponse, Active, Closing] {
            assert!(from.can_transition_to(Failed), "{from} -> Failed");
        }
        assert!(!Disconnected.can_transition_to(Failed));
    }

    #[test]
    fn test_failed_only_leads_to_disconnected() {
        assert!(Failed.can_transition_to(Disconnected));
        assert!(!Failed.can_transition_to(Connecting));
        assert!(!Failed.can_transition_to(Active));
    }

    #[test]
    fn test_cannot_skip_the_handshake() {
        assert!(!Disconnected.can_transition_to(Active));
        assert!(!Connecting.can_transition_to(Active));
    }

    #[test]
    fn test_is_active_and_is_terminal() {
        assert!(Active.is_active());
        assert!(!AwaitingLoginResponse.is_active());
        assert!(Disconnected.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Closing.is_terminal());
    }

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), Disconnected);
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(
            CloseReason::Lost("reset".into()).to_string(),
            "connection lost: reset"
        );
        assert_eq!(CloseReason::TimedOut.to_string(), "login handshake timed out");
    }
}
