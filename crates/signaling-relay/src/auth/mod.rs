//! Bearer token authentication for signaling connections.
//!
//! Tokens are HS256 JWTs issued by the identity service and presented as the
//! `token` query parameter on the WebSocket upgrade request.

mod claims;
mod verifier;

pub use claims::Claims;
pub use verifier::TokenVerifier;
