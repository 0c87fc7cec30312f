//! Signaling relay error types.
//!
//! Each type is contained to the place it occurs:
//!
//! - [`AuthError`] rejects a connection attempt (close code 4401, no retry)
//! - [`SendError`] is isolated to one recipient and only ever logged
//! - [`ProtocolError`] ends the offending peer's session
//! - [`RegistryError`] signals a broken membership invariant
//! - [`RelayError`] covers process startup and serving
//!
//! None of the per-peer errors may escape one peer's task into another's.

use crate::config::ConfigError;
use common::types::{PeerId, RoomCode};
use thiserror::Error;

/// WebSocket close code sent when a connection fails authentication.
///
/// Codes 4000-4999 are reserved for application use; 4401 mirrors HTTP 401.
pub const AUTH_FAILED_CLOSE_CODE: u16 = 4401;

/// Token verification failures.
///
/// All variants map to the same close code and the same client-facing text.
/// The variant is only visible in server logs and metrics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token was supplied with the connection request.
    #[error("Missing bearer token")]
    Missing,

    /// Token could not be parsed or decoded.
    #[error("Malformed token")]
    Malformed,

    /// Signature does not match the configured secret/algorithm.
    #[error("Token signature mismatch")]
    BadSignature,

    /// Token lifetime has elapsed.
    #[error("Token expired")]
    Expired,

    /// Token `iat` lies beyond the allowed clock skew.
    #[error("Token issued in the future")]
    Immature,
}

impl AuthError {
    /// Bounded label used for logs and the `reason` metric label.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Malformed => "malformed",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "expired",
            AuthError::Immature => "immature",
        }
    }

    /// Client-safe close reason (identical for all variants).
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        "unauthorized"
    }

    /// WebSocket close code for this failure.
    #[must_use]
    pub fn close_code(&self) -> u16 {
        AUTH_FAILED_CLOSE_CODE
    }
}

/// Failure to hand a message to one peer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The peer is closed or its writer has gone away.
    #[error("Peer is closed")]
    Closed,

    /// The peer's outbound queue is full.
    #[error("Peer outbound queue is full")]
    Backpressure,
}

impl SendError {
    /// Bounded label for the `reason` metric label.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            SendError::Closed => "closed",
            SendError::Backpressure => "backpressure",
        }
    }
}

/// Malformed inbound framing from a peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A text frame that is not valid JSON.
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    /// A binary frame; signaling is text-only.
    #[error("Binary frames are not supported")]
    BinaryFrame,
}

/// Room membership invariant violations.
///
/// Not expected under correct locking. Logged at error level; the session is
/// still torn down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The session was not a member of the room it claims to belong to.
    #[error("Peer {peer} is not a member of room {room}")]
    NotMember { room: RoomCode, peer: PeerId },
}

/// Service-level failures surfaced from startup and the accept loop.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics recorder error: {0}")]
    Metrics(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
