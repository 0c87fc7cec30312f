//! # Relay Test Utilities
//!
//! Shared test utilities for the signaling relay.
//!
//! This crate provides:
//! - HS256 token builders (`TestTokenBuilder`)
//! - Server test harness (`TestRelayServer` for E2E tests)
//! - WebSocket test client (`TestWsClient`)
//! - In-memory peer driving the relay without a socket (`TestPeer`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestRelayServer::spawn().await?;
//!     let token = server.token().for_user("admin").build();
//!
//!     let mut alice = TestWsClient::connect(&server.ws_url("abc123", Some(&token))).await?;
//!     alice.assert_silent().await;
//!     Ok(())
//! }
//! ```

pub mod peer;
pub mod server_harness;
pub mod token_builders;
pub mod ws_client;

// Re-export commonly used items
pub use peer::*;
pub use server_harness::*;
pub use token_builders::*;
pub use ws_client::*;
