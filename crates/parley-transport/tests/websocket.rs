//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real WebSocket server on a loopback port and
//! connect the client transport to it, verifying that frames actually
//! flow over the network in both directions.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use parley_transport::{
        Connection, Connector, TransportError, WebSocketConnector,
    };
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Helper: binds a listener on a random port and returns it with the
    /// `ws://` URL a client should dial.
    async fn bind() -> (TcpListener, String) {
        // "127.0.0.1:0" tells the OS to pick an available port.
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}"))
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed")
    }

    #[tokio::test]
    async fn test_websocket_connect_and_send_receive() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let client = WebSocketConnector
            .connect(&url)
            .await
            .expect("client should connect");
        let mut server_ws = server.await.expect("task should complete");

        assert!(client.id().into_inner() > 0);

        // --- Client sends, server receives a TEXT frame ---
        client
            .send_text(r#"{"type":"login","username":"alice"}"#)
            .await
            .expect("send should succeed");

        let msg = server_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "client must send text frames");
        assert_eq!(
            msg.into_text().unwrap().as_str(),
            r#"{"type":"login","username":"alice"}"#
        );

        // --- Server sends text, client receives bytes ---
        server_ws
            .send(Message::text("hello from server".to_owned()))
            .await
            .unwrap();
        let received = client
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from server");

        // --- Binary frames are accepted too ---
        server_ws
            .send(Message::Binary(b"raw".to_vec().into()))
            .await
            .unwrap();
        let received = client.recv().await.unwrap().unwrap();
        assert_eq!(received, b"raw");

        client.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_server_close() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let client = WebSocketConnector.connect(&url).await.unwrap();
        let mut server_ws = server.await.unwrap();

        server_ws.send(Message::Close(None)).await.unwrap();

        let result = client.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_websocket_close_is_idempotent() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let client = WebSocketConnector.connect(&url).await.unwrap();
        let _server_ws = server.await.unwrap();

        client.close().await.expect("first close");
        client.close().await.expect("second close is a no-op");
        assert!(client.recv().await.unwrap().is_none());
        assert!(matches!(
            client.send_text("late").await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_websocket_connect_refused() {
        // Bind then drop so the port is (almost certainly) closed.
        let (listener, url) = bind().await;
        drop(listener);

        let result = WebSocketConnector.connect(&url).await;

        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }
}
