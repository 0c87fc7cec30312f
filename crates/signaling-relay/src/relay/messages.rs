//! Signaling payloads carried between peers.
//!
//! The relay never looks inside client payloads. A text frame is checked to
//! be well-formed JSON once, on receipt, and is then shared by reference
//! across every recipient's outbound queue and written back out byte-for-byte.

use crate::errors::ProtocolError;
use std::fmt;
use std::sync::Arc;

/// Wire text of the notice sent to existing peers when someone joins.
pub const PEER_JOIN: &str = r#"{"type":"peer-join"}"#;

/// Wire text of the notice sent to remaining peers when someone leaves.
pub const PEER_LEAVE: &str = r#"{"type":"peer-leave"}"#;

/// Messages synthesized by the relay itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    PeerJoin,
    PeerLeave,
}

impl ControlMessage {
    /// Exact JSON text written to the wire.
    #[must_use]
    pub fn wire_text(self) -> &'static str {
        match self {
            ControlMessage::PeerJoin => PEER_JOIN,
            ControlMessage::PeerLeave => PEER_LEAVE,
        }
    }
}

/// An opaque JSON text payload.
///
/// Cloning is a reference-count bump, so fan-out to N peers allocates once.
#[derive(Clone, PartialEq, Eq)]
pub struct SignalingMessage(Arc<str>);

impl SignalingMessage {
    /// Accept a client text frame if it is syntactically valid JSON.
    ///
    /// The text is kept exactly as received; no re-serialization happens.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidJson` if `text` does not parse.
    pub fn parse(text: impl Into<Arc<str>>) -> Result<Self, ProtocolError> {
        let text: Arc<str> = text.into();
        serde_json::from_str::<serde::de::IgnoredAny>(&text)
            .map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Ok(Self(text))
    }

    /// Build a relay-synthesized control message.
    #[must_use]
    pub fn control(kind: ControlMessage) -> Self {
        Self(Arc::from(kind.wire_text()))
    }

    /// The payload text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Payloads carry SDP and ICE candidates (host addresses); keep them out of logs.
impl fmt::Debug for SignalingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalingMessage")
            .field("len", &self.0.len())
            .finish()
    }
}
