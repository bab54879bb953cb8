//! In-process transport: two connected endpoints joined by channels.
//!
//! [`MemoryConnection::pair`] returns both ends of a duplex pipe. Whatever
//! one end sends with `send_text`, the other end receives with `recv`.
//! Dropping or closing one end makes the other end's `recv` return
//! `Ok(None)`, the same signal a real socket gives on a clean close.
//!
//! Tests use one end as the "server" and hand the other end to the client
//! through a [`MemoryConnector`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::{Connection, ConnectionId, Connector, TransportError};

/// One end of an in-memory duplex connection.
pub struct MemoryConnection {
    id: ConnectionId,
    /// `None` once this end has been closed.
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// Creates two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::new(a_tx, b_rx), Self::new(b_tx, a_rx))
    }

    fn new(
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        Self {
            id: ConnectionId::next(),
            outbound: Mutex::new(Some(outbound)),
            inbound: tokio::sync::Mutex::new(inbound),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns `true` once this end has been closed locally.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        let outbound =
            self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = outbound.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("closed locally".into())
        })?;
        tx.send(text.as_bytes().to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("peer dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.is_closed() {
            return Ok(None);
        }
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // Dropping the sender is what the peer observes as EOF.
            self.outbound
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// A [`Connector`] that hands out a single pre-built [`MemoryConnection`].
///
/// Every URL it is asked to connect to is recorded, so tests can assert on
/// endpoint resolution. Once the connection has been handed out (or if the
/// connector was built with [`refusing`](Self::refusing)) further connects
/// fail with [`TransportError::ConnectFailed`].
#[derive(Default)]
pub struct MemoryConnector {
    pending: Mutex<Option<MemoryConnection>>,
    requested: Mutex<Vec<String>>,
}

impl MemoryConnector {
    /// Creates a connector that will yield `conn` on the first connect.
    pub fn new(conn: MemoryConnection) -> Self {
        Self {
            pending: Mutex::new(Some(conn)),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Creates a connector that refuses every connect.
    pub fn refusing() -> Self {
        Self::default()
    }

    /// Returns every URL passed to `connect`, in call order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;
    type Error = TransportError;

    async fn connect(
        &self,
        url: &str,
    ) -> Result<Self::Connection, Self::Error> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());

        let conn = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        conn.ok_or_else(|| {
            TransportError::ConnectFailed(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no memory connection available for {url}"),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_in_both_directions() {
        let (client, server) = MemoryConnection::pair();

        client.send_text("ping").await.unwrap();
        assert_eq!(server.recv().await.unwrap().unwrap(), b"ping");

        server.send_text("pong").await.unwrap();
        assert_eq!(client.recv().await.unwrap().unwrap(), b"pong");
    }

    #[tokio::test]
    async fn test_close_is_seen_as_eof_by_peer() {
        let (client, server) = MemoryConnection::pair();

        client.close().await.unwrap();

        assert!(server.recv().await.unwrap().is_none());
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_close_twice_is_noop() {
        let (client, _server) = MemoryConnection::pair();

        client.close().await.unwrap();
        client.close().await.expect("second close should succeed");
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (client, _server) = MemoryConnection::pair();
        client.close().await.unwrap();

        let result = client.send_text("late").await;

        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let (client, server) = MemoryConnection::pair();
        drop(server);

        let result = client.send_text("anyone?").await;

        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_recv_after_local_close_returns_none() {
        let (client, server) = MemoryConnection::pair();
        server.send_text("unread").await.unwrap();

        client.close().await.unwrap();

        assert!(client.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connector_hands_out_connection_once() {
        let (client, _server) = MemoryConnection::pair();
        let connector = MemoryConnector::new(client);

        assert!(connector.connect("ws://a").await.is_ok());
        let second = connector.connect("ws://b").await;

        assert!(matches!(second, Err(TransportError::ConnectFailed(_))));
        assert_eq!(connector.requested_urls(), vec!["ws://a", "ws://b"]);
    }

    #[tokio::test]
    async fn test_refusing_connector_fails() {
        let connector = MemoryConnector::refusing();

        let result = connector.connect("ws://nowhere").await;

        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }
}
