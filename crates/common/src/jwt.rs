//! JWT utilities shared by the relay's token verifier.
//!
//! Holds the checks that run independently of the signature algorithm:
//!
//! - Size limit applied before any parsing
//! - Structural check (three dot-separated segments)
//! - Clock skew constants and `iat` validation
//!
//! Signature verification itself lives next to the verifier because it
//! depends on the configured secret.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens arrive as a query parameter on the WebSocket upgrade request, so
/// they are attacker-controlled and unbounded until checked. Anything above
/// this size is rejected before base64 decoding or HMAC computation.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens with `iat` more than this far in the future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors from the algorithm-independent token checks.
///
/// Display text is intentionally identical for every variant so that nothing
/// about the failure leaks to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not `header.payload.signature`.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Reject oversized or structurally invalid tokens before decoding.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - token does not have exactly three non-empty segments
pub fn check_token_shape(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let segments = token.split('.').count();
    // Header and payload must be non-empty; an unsigned token has an empty
    // third segment and is left for the signature check to reject.
    let mut parts = token.split('.');
    let header_ok = parts.next().is_some_and(|p| !p.is_empty());
    let payload_ok = parts.next().is_some_and(|p| !p.is_empty());
    if segments != 3 || !header_ok || !payload_ok {
        tracing::debug!(
            target: "common.jwt",
            parts = segments,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(())
}

/// Validate the `iat` (issued-at) claim against an explicit `now` timestamp.
///
/// The relay's verifier is a pure function of `(token, secret, now)`, so the
/// caller supplies the clock.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + clock_skew`.
pub fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is bounded by MAX_CLOCK_SKEW at config load
    let clock_skew_secs = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // check_token_shape Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_check_token_shape_accepts_three_segments() {
        assert!(check_token_shape("aGVhZGVy.cGF5bG9hZA.c2ln").is_ok());
    }

    #[test]
    fn test_check_token_shape_rejects_wrong_segment_count() {
        for token in ["", "single", "only.two", "not.a.valid.jwt"] {
            assert_eq!(
                check_token_shape(token),
                Err(JwtValidationError::MalformedToken),
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_check_token_shape_rejects_empty_header_or_payload() {
        assert_eq!(
            check_token_shape(".payload.sig"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            check_token_shape("header..sig"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_check_token_shape_oversized() {
        let oversized = format!("{}.b.c", "a".repeat(MAX_JWT_SIZE_BYTES));
        assert_eq!(
            check_token_shape(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_check_token_shape_at_size_limit() {
        let filler = "a".repeat(MAX_JWT_SIZE_BYTES - 4);
        let token = format!("{filler}.b.c");
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        assert!(check_token_shape(&token).is_ok());
    }

    // -------------------------------------------------------------------------
    // validate_iat_at Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_at_past_time() {
        let now = 1_700_000_000_i64;
        assert!(validate_iat_at(now, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert!(validate_iat_at(now - 3600, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000_i64;

        // iat == now + skew is the last accepted value
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());

        // iat == now + skew + 1 is the first rejected value
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_validate_iat_zero_skew() {
        let now = 1_700_000_000_i64;
        assert!(validate_iat_at(now, Duration::ZERO, now).is_ok());
        assert!(validate_iat_at(now + 1, Duration::ZERO, now).is_err());
    }

    #[test]
    fn test_errors_share_generic_message() {
        let messages: Vec<String> = [
            JwtValidationError::TokenTooLarge,
            JwtValidationError::MalformedToken,
            JwtValidationError::IatTooFarInFuture,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert!(messages.iter().all(|m| m == "The access token is invalid or expired"));
    }
}
