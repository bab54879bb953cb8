//! WebSocket transport implementation using `tokio-tungstenite`.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, Connector, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Connector`] that dials `ws://` (and, with the `tls` feature,
/// `wss://`) URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn connect(
        &self,
        url: &str,
    ) -> Result<Self::Connection, Self::Error> {
        let (ws, _response) =
            tokio_tungstenite::connect_async(url).await.map_err(|e| {
                TransportError::ConnectFailed(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, url, "WebSocket connection open");

        // Split so a pending `recv` never holds the lock a `send` needs.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        })
    }
}

/// A single client-side WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    closed: AtomicBool,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed(
                "closed locally".into(),
            ));
        }
        self.sink
            .lock()
            .await
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(
                    tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed,
                )) => return Ok(None),
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        io::Error::new(io::ErrorKind::ConnectionReset, e),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(id = %self.id, "closing WebSocket connection");
        match self.sink.lock().await.close().await {
            Ok(())
            | Err(
                tungstenite::Error::ConnectionClosed
                | tungstenite::Error::AlreadyClosed,
            ) => Ok(()),
            Err(e) => Err(TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                e,
            ))),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
