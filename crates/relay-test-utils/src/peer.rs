//! In-memory test peer
//!
//! Drives `SignalingRelay::run` through channels instead of a socket, so relay
//! semantics can be tested without networking.

use common::types::{PeerId, RoomCode};
use signaling_relay::errors::ProtocolError;
use signaling_relay::relay::{PeerSession, SignalingMessage, SignalingRelay};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::ws_client::{RECV_TIMEOUT, SILENCE_WINDOW};

/// A peer connected to a relay through in-memory channels.
///
/// # Example
/// ```rust,ignore
/// let relay = Arc::new(SignalingRelay::from_config(&config));
/// let mut a = TestPeer::join(&relay, "abc123").await;
/// let b = TestPeer::join(&relay, "abc123").await;
/// assert_eq!(a.recv().await, r#"{"type":"peer-join"}"#);
/// ```
pub struct TestPeer {
    session: Arc<PeerSession>,
    input: Option<mpsc::Sender<Result<SignalingMessage, ProtocolError>>>,
    output: mpsc::Receiver<SignalingMessage>,
    task: Option<JoinHandle<()>>,
}

impl TestPeer {
    /// Open a session in `code` and wait until it is registered.
    pub async fn join(relay: &Arc<SignalingRelay>, code: &str) -> Self {
        let room = RoomCode::from(code);
        let (session, output) = relay.open_session(room.clone());
        let (input, input_rx) = mpsc::channel(64);
        let task = relay.spawn(Arc::clone(&session), ReceiverStream::new(input_rx));

        let id = session.id();
        tokio::time::timeout(RECV_TIMEOUT, async {
            while !relay.registry().snapshot(&room).iter().any(|s| s.id() == id) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("peer should be registered");

        Self {
            session,
            input: Some(input),
            output,
            task: Some(task),
        }
    }

    pub fn id(&self) -> PeerId {
        self.session.id()
    }

    pub fn session(&self) -> &Arc<PeerSession> {
        &self.session
    }

    /// Send a JSON payload as this peer.
    pub async fn send(&self, text: &str) {
        let message = SignalingMessage::parse(text).expect("test payload should be JSON");
        self.push(Ok(message)).await;
    }

    /// Inject a protocol error as if the client sent a bad frame.
    pub async fn send_protocol_error(&self, err: ProtocolError) {
        self.push(Err(err)).await;
    }

    async fn push(&self, item: Result<SignalingMessage, ProtocolError>) {
        self.input
            .as_ref()
            .expect("peer already disconnected")
            .send(item)
            .await
            .expect("session task should be running");
    }

    /// Next message delivered to this peer.
    pub async fn recv(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.output.recv())
            .await
            .expect("timed out waiting for message")
            .expect("outbound queue closed")
            .as_str()
            .to_string()
    }

    /// Assert nothing is delivered within the silence window.
    pub async fn assert_silent(&mut self) {
        let got = tokio::time::timeout(SILENCE_WINDOW, self.output.recv()).await;
        if let Ok(Some(message)) = got {
            panic!("expected no message, got {}", message.as_str());
        }
    }

    /// Disconnect and wait for the leave sequence to finish.
    pub async fn disconnect(&mut self) {
        self.input.take();
        self.wait_closed().await;
    }

    /// Wait for the session task to end (after any cause of close).
    pub async fn wait_closed(&mut self) {
        if let Some(task) = self.task.take() {
            tokio::time::timeout(RECV_TIMEOUT, task)
                .await
                .expect("session task should finish")
                .expect("session task should not panic");
        }
    }
}
