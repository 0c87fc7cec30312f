//! Signaling relay: session lifecycle orchestration.
//!
//! One task per connected peer runs [`SignalingRelay::run`]:
//!
//! 1. Join - register in the room, tell the pre-join members `peer-join`
//! 2. Relay - forward each inbound message to every other current member
//! 3. Leave - deregister, close, tell the remaining members `peer-leave`
//!
//! A failure while sending to one recipient never interrupts the sender's
//! loop: the failed recipient is closed and its own task runs step 3.

use crate::auth::{Claims, TokenVerifier};
use crate::config::Config;
use crate::errors::AuthError;
use crate::observability::metrics;
use crate::relay::messages::{ControlMessage, SignalingMessage};
use crate::relay::registry::RoomRegistry;
use crate::relay::session::{Inbound, PeerReceiver, PeerSession};
use common::secret::SecretString;
use common::types::{PeerId, RoomCode};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, Instrument};

/// Relay state shared by every connection.
pub struct SignalingRelay {
    registry: Arc<RoomRegistry>,
    verifier: TokenVerifier,
    peer_queue_capacity: usize,
    cancel_token: CancellationToken,
}

impl SignalingRelay {
    #[must_use]
    pub fn new(
        registry: Arc<RoomRegistry>,
        verifier: TokenVerifier,
        peer_queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            verifier,
            peer_queue_capacity,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Build a relay with a fresh registry from service configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(RoomRegistry::new()),
            TokenVerifier::from_config(config),
            config.peer_queue_capacity,
        )
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Handshake step: verify the connection's bearer token.
    ///
    /// Nothing is registered on failure.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` explaining the rejection. Callers must close
    /// the connection with [`AuthError::close_code`].
    pub fn authenticate(&self, token: Option<&SecretString>) -> Result<Claims, AuthError> {
        self.verifier.authenticate(token).map_err(|e| {
            metrics::record_auth_rejection(e.reason());
            tracing::info!(
                target: "relay.auth",
                reason = e.reason(),
                "Connection rejected"
            );
            e
        })
    }

    /// Create a session for a verified connection.
    ///
    /// The session's cancellation token is a child of the relay's, so
    /// [`SignalingRelay::shutdown`] closes every session.
    #[must_use]
    pub fn open_session(
        &self,
        room: RoomCode,
    ) -> (Arc<PeerSession>, mpsc::Receiver<SignalingMessage>) {
        PeerSession::new(room, self.peer_queue_capacity, self.cancel_token.child_token())
    }

    /// Drive one session from join to leave.
    ///
    /// Returns once the client disconnects, sends something unrelayable, or
    /// the session is closed from elsewhere. The session is always removed
    /// from its room before this returns.
    #[instrument(
        skip_all,
        name = "relay.session",
        fields(room = %session.room(), peer_id = %session.id())
    )]
    pub async fn run<S>(&self, session: Arc<PeerSession>, inbound: S)
    where
        S: Stream<Item = Result<SignalingMessage, crate::errors::ProtocolError>> + Unpin,
    {
        // Join
        let peers_before = self.registry.join(&session);
        session.activate();
        let notified = self.broadcast(
            &peers_before,
            &SignalingMessage::control(ControlMessage::PeerJoin),
            None,
        );
        tracing::info!(
            target: "relay.session",
            peers_notified = notified,
            "Peer joined"
        );

        // Relay
        let mut receiver = PeerReceiver::new(Arc::clone(&session), inbound);
        loop {
            match receiver.receive().await {
                Inbound::Message(message) => {
                    let recipients = self.registry.snapshot(session.room());
                    let delivered = self.broadcast(&recipients, &message, Some(session.id()));
                    metrics::record_messages_relayed(delivered);
                    tracing::trace!(
                        target: "relay.session",
                        bytes = message.len(),
                        delivered = delivered,
                        "Message relayed"
                    );
                }
                Inbound::Closed => {
                    tracing::debug!(target: "relay.session", "Inbound closed");
                    break;
                }
                Inbound::ProtocolError(e) => {
                    metrics::record_protocol_error();
                    tracing::warn!(
                        target: "relay.session",
                        error = %e,
                        "Protocol error, ending session"
                    );
                    break;
                }
            }
        }

        // Leave
        let remaining = match self.registry.leave(&session) {
            Ok(remaining) => remaining,
            Err(e) => {
                tracing::error!(target: "relay.session", error = %e, "Registry invariant violated");
                Vec::new()
            }
        };
        session.close();
        if !remaining.is_empty() {
            self.broadcast(
                &remaining,
                &SignalingMessage::control(ControlMessage::PeerLeave),
                None,
            );
        }
        tracing::info!(
            target: "relay.session",
            peers_remaining = remaining.len(),
            "Peer left"
        );
    }

    /// Spawn [`SignalingRelay::run`] on the runtime, carrying the current span.
    pub fn spawn<S>(
        self: &Arc<Self>,
        session: Arc<PeerSession>,
        inbound: S,
    ) -> tokio::task::JoinHandle<()>
    where
        S: Stream<Item = Result<SignalingMessage, crate::errors::ProtocolError>>
            + Unpin
            + Send
            + 'static,
    {
        let relay = Arc::clone(self);
        tokio::spawn(
            async move { relay.run(session, inbound).await }.in_current_span(),
        )
    }

    /// Enqueue `message` to each recipient except `exclude`.
    ///
    /// Best-effort: a recipient that cannot accept the message is logged,
    /// counted and closed. Returns the number of successful enqueues.
    pub fn broadcast(
        &self,
        recipients: &[Arc<PeerSession>],
        message: &SignalingMessage,
        exclude: Option<PeerId>,
    ) -> usize {
        let mut delivered = 0;
        for peer in recipients {
            if Some(peer.id()) == exclude {
                continue;
            }
            match peer.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    metrics::record_send_failure(e.reason());
                    tracing::debug!(
                        target: "relay.session",
                        recipient = %peer.id(),
                        reason = e.reason(),
                        "Send to peer failed, closing it"
                    );
                    peer.close();
                }
            }
        }
        delivered
    }

    /// Close every session. Each session's task then runs its leave sequence.
    pub fn shutdown(&self) {
        tracing::info!(
            target: "relay.session",
            rooms = self.registry.room_count(),
            peers = self.registry.total_peers(),
            "Closing all sessions"
        );
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
