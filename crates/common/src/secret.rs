//! Secret wrappers for values that must never reach logs.
//!
//! Re-exports the [`secrecy`] types. The relay keeps its HS256 verification
//! secret and every bearer token it handles inside a [`SecretString`], so a
//! stray `{:?}` in a tracing call prints `[REDACTED]` instead of key
//! material. Reading the value requires an explicit `expose_secret()`.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let jwt_secret = SecretString::from("dev-secret");
//! assert!(format!("{jwt_secret:?}").contains("REDACTED"));
//! assert_eq!(jwt_secret.expose_secret(), "dev-secret");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

/// Wrap a raw bearer token taken from a connection request.
///
/// Empty strings are treated as "no token": browsers commonly send
/// `?token=` when the client-side storage is empty.
#[must_use]
pub fn bearer_token(raw: Option<&str>) -> Option<SecretString> {
    raw.filter(|t| !t.is_empty()).map(SecretString::from)
}
