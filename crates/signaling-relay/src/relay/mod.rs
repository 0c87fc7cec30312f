//! Room-based signaling relay.
//!
//! - [`messages`] - opaque payloads and relay control notices
//! - [`session`] - one connected peer (outbound queue, inbound receive, state)
//! - [`registry`] - room code to members, with room lifecycle
//! - [`service`] - join / relay / leave orchestration

pub mod messages;
pub mod registry;
pub mod service;
pub mod session;

pub use messages::{ControlMessage, SignalingMessage};
pub use registry::RoomRegistry;
pub use service::SignalingRelay;
pub use session::{Inbound, InboundStream, PeerReceiver, PeerSession, SessionState};
