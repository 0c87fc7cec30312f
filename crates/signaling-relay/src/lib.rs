//! Signaling Relay Library
//!
//! WebRTC signaling relay for the video-call service:
//!
//! - Authenticates WebSocket connections with HS256 bearer tokens
//! - Groups connections into rooms keyed by an opaque room code
//! - Relays signaling payloads (SDP offers/answers, ICE candidates) verbatim
//!   to every other peer in the room
//! - Announces `peer-join` / `peer-leave` to the rest of the room
//!
//! All room state is in-memory and process-local.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/ws.rs -> relay/service.rs -> relay/{registry,session}.rs
//!                                          |
//!                                          +-> auth/verifier.rs
//! ```
//!
//! # Modules
//!
//! - [`auth`] - Token verification and claims
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types per failure domain
//! - [`handlers`] - HTTP and WebSocket handlers
//! - [`observability`] - Metrics and health state
//! - [`relay`] - Rooms, sessions and the relay loop
//! - [`routes`] - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod observability;
pub mod relay;
pub mod routes;
