//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a [`ConnectionManager`](crate::ConnectionManager).
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```rust
/// use std::time::Duration;
/// use parley::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_handshake_timeout(Duration::from_secs(3))
///     .with_echo_window(Duration::from_secs(2));
/// assert_eq!(config.event_channel_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long to wait for `login_response` after sending `login`.
    pub handshake_timeout: Duration,

    /// How long a provisional message may wait for its echo before it is
    /// reported as overdue. Overdue entries stay in the log.
    pub echo_window: Duration,

    /// Capacity of the per-session event channel. Values below 1 are
    /// treated as 1.
    pub event_channel_capacity: usize,

    /// How long `close` waits for the session task before aborting it.
    pub close_timeout: Duration,

    /// Page port that marks a development server.
    pub dev_server_port: u16,

    /// Backend port used when the page is on `dev_server_port`.
    pub dev_backend_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            echo_window: Duration::from_secs(5),
            event_channel_capacity: 256,
            close_timeout: Duration::from_secs(1),
            dev_server_port: 5173,
            dev_backend_port: 8080,
        }
    }
}

impl ClientConfig {
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_echo_window(mut self, window: Duration) -> Self {
        self.echo_window = window;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Sets the development page port and the backend port it maps to.
    pub fn with_dev_ports(mut self, server: u16, backend: u16) -> Self {
        self.dev_server_port = server;
        self.dev_backend_port = backend;
        self
    }

    /// Event channel capacity, clamped to at least 1.
    pub(crate) fn event_capacity(&self) -> usize {
        self.event_channel_capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.echo_window, Duration::from_secs(5));
        assert_eq!(config.dev_server_port, 5173);
        assert_eq!(config.dev_backend_port, 8080);
    }

    #[test]
    fn test_event_capacity_is_clamped() {
        let config = ClientConfig::default().with_event_channel_capacity(0);
        assert_eq!(config.event_capacity(), 1);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"dev_backend_port": 9000}"#).unwrap();

        assert_eq!(config.dev_backend_port, 9000);
        assert_eq!(config.dev_server_port, 5173);
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_durations_read_from_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"handshake_timeout": {"secs": 3, "nanos": 0}}"#,
        )
        .unwrap();

        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
    }
}
