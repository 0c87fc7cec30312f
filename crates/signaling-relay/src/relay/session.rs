//! Peer session: one connected client.
//!
//! A session has two halves:
//!
//! - [`PeerSession`] is the shared handle stored in the room registry. Other
//!   peers' tasks call [`PeerSession::send`] on it to enqueue messages.
//! - [`PeerReceiver`] is owned by the session's own task and yields inbound
//!   messages until the client disconnects or the session is closed.
//!
//! Outbound messages go through a bounded queue drained by the transport's
//! writer. Enqueueing never waits: a full queue is a `Backpressure` failure
//! and closes the slow peer rather than stalling the sender.
//!
//! # State machine
//!
//! ```text
//! Connecting --activate()--> Active --close()--> Closed
//!      \_____________________close()_____________/
//! ```
//!
//! Transitions only move forward. `close()` is idempotent and reports
//! whether the calling context performed the transition.

use crate::errors::{ProtocolError, SendError};
use crate::relay::messages::SignalingMessage;
use common::types::{PeerId, RoomCode};
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Active = 1,
    Closed = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Active,
            _ => SessionState::Closed,
        }
    }
}

/// Shared handle to one connected peer.
pub struct PeerSession {
    id: PeerId,
    room: RoomCode,
    outbound: mpsc::Sender<SignalingMessage>,
    state: AtomicU8,
    cancel_token: CancellationToken,
}

impl PeerSession {
    /// Create a session in the `Connecting` state.
    ///
    /// Returns the shared handle and the receiving end of its outbound queue,
    /// which the transport writer drains.
    #[must_use]
    pub fn new(
        room: RoomCode,
        queue_capacity: usize,
        cancel_token: CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<SignalingMessage>) {
        let (outbound, rx) = mpsc::channel(queue_capacity.max(1));
        let session = Arc::new(Self {
            id: PeerId::new(),
            room,
            outbound,
            state: AtomicU8::new(SessionState::Connecting as u8),
            cancel_token,
        });
        (session, rx)
    }

    #[must_use]
    pub fn id(&self) -> PeerId {
        self.id
    }

    #[must_use]
    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move `Connecting -> Active`. No effect in any other state.
    pub fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Enqueue a message for this peer without waiting.
    ///
    /// # Errors
    ///
    /// - `SendError::Closed` - session closed or its writer is gone
    /// - `SendError::Backpressure` - outbound queue is full
    pub fn send(&self, message: SignalingMessage) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        self.outbound.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Close the session. Safe to call from any task, any number of times.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn close(&self) -> bool {
        let previous = self
            .state
            .swap(SessionState::Closed as u8, Ordering::AcqRel);
        let transitioned = previous != SessionState::Closed as u8;
        if transitioned {
            self.cancel_token.cancel();
            tracing::debug!(
                target: "relay.session",
                peer_id = %self.id,
                room = %self.room,
                "Session closed"
            );
        }
        transitioned
    }

    /// Whether the session is closed, either explicitly or by cancellation
    /// of a parent token (server shutdown).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed || self.cancel_token.is_cancelled()
    }

    /// Resolves once the session has been closed or cancelled.
    pub async fn closed(&self) {
        self.cancel_token.cancelled().await;
    }
}

impl std::fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("id", &self.id)
            .field("room", &self.room)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Result of waiting for the next inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A well-formed payload to relay.
    Message(SignalingMessage),
    /// The client disconnected or the session was closed.
    Closed,
    /// The client sent something the relay cannot forward.
    ProtocolError(ProtocolError),
}

/// Stream of decoded inbound frames produced by a transport.
pub type InboundStream = futures::stream::BoxStream<'static, Result<SignalingMessage, ProtocolError>>;

/// Receiving half of a session, owned by the session's task.
pub struct PeerReceiver<S> {
    session: Arc<PeerSession>,
    inbound: S,
}

impl<S> PeerReceiver<S>
where
    S: Stream<Item = Result<SignalingMessage, ProtocolError>> + Unpin,
{
    #[must_use]
    pub fn new(session: Arc<PeerSession>, inbound: S) -> Self {
        Self { session, inbound }
    }

    /// Wait for the next inbound message, disconnect, or cancellation.
    ///
    /// Cancellation wins over pending input, so a closed session stops
    /// relaying immediately even if the client keeps sending.
    pub async fn receive(&mut self) -> Inbound {
        tokio::select! {
            biased;

            () = self.session.closed() => Inbound::Closed,
            next = self.inbound.next() => match next {
                Some(Ok(message)) => Inbound::Message(message),
                Some(Err(e)) => Inbound::ProtocolError(e),
                None => Inbound::Closed,
            },
        }
    }
}
