//! WebSocket test client
//!
//! Thin wrapper over `tokio-tungstenite` with timeouts and assertions sized
//! for signaling tests.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Default wait for an expected frame.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Window in which "no message" is asserted.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(150);

/// A connected signaling client.
pub struct TestWsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestWsClient {
    /// Open a WebSocket to `url`.
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket connect to {} failed: {}", url, e))?;
        Ok(Self { stream })
    }

    /// Send a text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send a binary frame.
    pub async fn send_binary(&mut self, bytes: &[u8]) -> Result<(), anyhow::Error> {
        self.stream.send(Message::Binary(bytes.to_vec())).await?;
        Ok(())
    }

    /// Next data or close frame, skipping ping/pong. `None` if the stream ended.
    pub async fn next_frame(&mut self) -> Result<Option<Message>, anyhow::Error> {
        let fut = async {
            while let Some(msg) = self.stream.next().await {
                match msg {
                    Ok(Message::Ping(_) | Message::Pong(_)) => continue,
                    Ok(other) => return Ok(Some(other)),
                    // Abrupt close after the close frame is fine for tests.
                    Err(_) => return Ok(None),
                }
            }
            Ok(None)
        };
        tokio::time::timeout(RECV_TIMEOUT, fut)
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for a frame"))?
    }

    /// Receive the next text frame.
    pub async fn recv_text(&mut self) -> Result<String, anyhow::Error> {
        match self.next_frame().await? {
            Some(Message::Text(text)) => Ok(text),
            other => Err(anyhow::anyhow!("expected text frame, got {:?}", other)),
        }
    }

    /// Receive the server's close frame.
    pub async fn recv_close(&mut self) -> Result<Option<CloseFrame<'static>>, anyhow::Error> {
        match self.next_frame().await? {
            Some(Message::Close(frame)) => Ok(frame),
            None => Ok(None),
            other => Err(anyhow::anyhow!("expected close frame, got {:?}", other)),
        }
    }

    /// Assert no data frame arrives within [`SILENCE_WINDOW`].
    pub async fn assert_silent(&mut self) {
        let got = tokio::time::timeout(SILENCE_WINDOW, self.stream.next()).await;
        match got {
            Err(_) => {}
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            Ok(other) => panic!("expected no message, got {:?}", other),
        }
    }

    /// Close the connection from the client side.
    pub async fn close(mut self) -> Result<(), anyhow::Error> {
        self.stream.close(None).await?;
        // Drain until the server acknowledges.
        let _ = tokio::time::timeout(RECV_TIMEOUT, async {
            while let Some(Ok(_)) = self.stream.next().await {}
        })
        .await;
        Ok(())
    }
}
