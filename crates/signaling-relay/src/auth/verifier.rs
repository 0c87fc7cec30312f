//! HS256 token verification.
//!
//! # Security
//!
//! - Tokens are size- and shape-checked BEFORE decoding (DoS prevention)
//! - Only HS256 is accepted; any other declared algorithm is a signature failure
//! - Expiry and issued-at checks run against an explicit `now`, so the
//!   verifier is a pure function of `(token, secret, now)`
//! - The specific failure is logged at debug level only

use crate::auth::claims::Claims;
use crate::config::Config;
use crate::errors::AuthError;
use common::jwt::{check_token_shape, validate_iat_at};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::time::Duration;

/// Verifies bearer tokens issued by the identity service.
///
/// Holds only immutable key material and settings; share it behind an `Arc`.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_seconds: i64,
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret.
    ///
    /// # Arguments
    ///
    /// * `secret` - HS256 secret shared with the identity service
    /// * `token_ttl` - Maximum token age measured from `iat`
    /// * `clock_skew` - Tolerance for `iat` values ahead of the local clock
    #[must_use]
    pub fn new(secret: &SecretString, token_ttl: Duration, clock_skew: Duration) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

        // Time-based checks are done by hand against the caller's `now`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            decoding_key,
            validation,
            token_ttl_seconds: i64::try_from(token_ttl.as_secs()).unwrap_or(i64::MAX),
            clock_skew,
        }
    }

    /// Create a verifier from service configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl, config.clock_skew)
    }

    /// Verify a token at time `now` (Unix epoch seconds).
    ///
    /// # Checks
    ///
    /// 1. Size and segment check - reject oversized or non-JWT input
    /// 2. Signature - HMAC-SHA256 with the configured secret
    /// 3. Claims decode - `sub` and `iat` must be present
    /// 4. Embedded expiry - rejected once `now >= exp`
    /// 5. Token age - rejected once `now > iat + ttl`
    /// 6. Issued-at - rejected if `iat` is beyond the clock skew
    /// 7. Not-before - rejected if `nbf` is beyond the clock skew
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` - token cannot be parsed or decoded
    /// - `AuthError::BadSignature` - signature or algorithm mismatch
    /// - `AuthError::Expired` - embedded expiry or TTL elapsed
    /// - `AuthError::Immature` - `iat` or `nbf` too far in the future
    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        check_token_shape(token).map_err(|e| {
            tracing::debug!(target: "relay.auth", error = ?e, "Token shape check failed");
            AuthError::Malformed
        })?;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                let err = classify(e.kind());
                tracing::debug!(
                    target: "relay.auth",
                    error = %e,
                    reason = err.reason(),
                    "Token verification failed"
                );
                err
            })?;
        let claims = token_data.claims;

        if let Some(exp) = claims.exp {
            if now >= exp {
                tracing::debug!(target: "relay.auth", exp = exp, now = now, "Token expired");
                return Err(AuthError::Expired);
            }
        }

        if now > claims.iat.saturating_add(self.token_ttl_seconds) {
            tracing::debug!(
                target: "relay.auth",
                iat = claims.iat,
                now = now,
                ttl_seconds = self.token_ttl_seconds,
                "Token older than configured lifetime"
            );
            return Err(AuthError::Expired);
        }

        validate_iat_at(claims.iat, self.clock_skew, now).map_err(|_| AuthError::Immature)?;

        if let Some(nbf) = claims.nbf {
            // Same skew tolerance as `iat`.
            if validate_iat_at(nbf, self.clock_skew, now).is_err() {
                tracing::debug!(target: "relay.auth", nbf = nbf, now = now, "Token not yet valid");
                return Err(AuthError::Immature);
            }
        }

        Ok(claims)
    }

    /// Authenticate an optional connection token against the wall clock.
    ///
    /// # Errors
    ///
    /// `AuthError::Missing` when no token was supplied, otherwise as
    /// [`TokenVerifier::verify`].
    pub fn authenticate(&self, token: Option<&SecretString>) -> Result<Claims, AuthError> {
        let token = token.ok_or(AuthError::Missing)?;
        self.verify(token.expose_secret(), chrono::Utc::now().timestamp())
    }
}

/// Map a `jsonwebtoken` failure onto the relay's auth taxonomy.
fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            AuthError::BadSignature
        }
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::Immature,
        _ => AuthError::Malformed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "dev-secret";
    const NOW: i64 = 1_700_000_000;
    const TTL: Duration = Duration::from_secs(720 * 60);

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(&SecretString::from(SECRET), TTL, Duration::from_secs(300))
    }

    fn sign(claims: &serde_json::Value, secret: &str, alg: Algorithm) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn login_token(iat: i64, exp: i64) -> String {
        sign(
            &json!({"sub": "admin", "iat": iat, "exp": exp, "role": "admin"}),
            SECRET,
            Algorithm::HS256,
        )
    }

    #[test]
    fn test_verify_valid_token_returns_claims_unchanged() {
        let token = sign(
            &json!({"sub": "admin", "iat": NOW, "exp": NOW + 60, "role": "admin", "ward": 7}),
            SECRET,
            Algorithm::HS256,
        );

        let claims = verifier().verify(&token, NOW).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, Some(NOW + 60));
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert_eq!(claims.extra.get("ward"), Some(&json!(7)));
    }

    #[test]
    fn test_verify_garbage_is_malformed() {
        for token in ["", "not-a-jwt", "a.b", "!!!.@@@.###", "a.b.c.d"] {
            assert_eq!(
                verifier().verify(token, NOW).unwrap_err(),
                AuthError::Malformed,
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_verify_oversized_is_malformed() {
        let token = format!("{}.b.c", "a".repeat(common::jwt::MAX_JWT_SIZE_BYTES));
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), AuthError::Malformed);
    }

    #[test]
    fn test_verify_missing_subject_is_malformed() {
        let token = sign(&json!({"iat": NOW, "exp": NOW + 60}), SECRET, Algorithm::HS256);
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), AuthError::Malformed);
    }

    #[test]
    fn test_verify_wrong_secret_is_bad_signature() {
        let token = sign(
            &json!({"sub": "admin", "iat": NOW, "exp": NOW + 60}),
            "some-other-secret",
            Algorithm::HS256,
        );
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), AuthError::BadSignature);
    }

    #[test]
    fn test_verify_wrong_algorithm_is_bad_signature() {
        let token = sign(
            &json!({"sub": "admin", "iat": NOW, "exp": NOW + 60}),
            SECRET,
            Algorithm::HS512,
        );
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), AuthError::BadSignature);
    }

    #[test]
    fn test_verify_tampered_payload_is_bad_signature() {
        let token = login_token(NOW, NOW + 60);
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = sign(
            &json!({"sub": "intruder", "iat": NOW, "exp": NOW + 60}),
            SECRET,
            Algorithm::HS256,
        );
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        assert_eq!(verifier().verify(&tampered, NOW).unwrap_err(), AuthError::BadSignature);
    }

    #[test]
    fn test_verify_embedded_expiry() {
        let token = login_token(NOW - 100, NOW);

        // exp == now has passed
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), AuthError::Expired);
        // one second before exp is still valid
        assert!(verifier().verify(&token, NOW - 1).is_ok());
    }

    #[test]
    fn test_verify_ttl_from_issued_at() {
        let ttl_secs = i64::try_from(TTL.as_secs()).unwrap();
        // exp far in the future, but iat older than the configured lifetime
        let token = login_token(NOW, NOW + 10 * ttl_secs);

        assert!(verifier().verify(&token, NOW + ttl_secs).is_ok());
        assert_eq!(
            verifier().verify(&token, NOW + ttl_secs + 1).unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn test_verify_token_without_exp_uses_ttl() {
        let token = sign(&json!({"sub": "admin", "iat": NOW}), SECRET, Algorithm::HS256);
        assert!(verifier().verify(&token, NOW + 60).is_ok());
        assert_eq!(
            verifier().verify(&token, NOW + 721 * 60).unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn test_verify_future_iat_is_immature() {
        let token = login_token(NOW + 301, NOW + 3600);
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), AuthError::Immature);

        let within_skew = login_token(NOW + 300, NOW + 3600);
        assert!(verifier().verify(&within_skew, NOW).is_ok());
    }

    #[test]
    fn test_verify_future_nbf_is_immature() {
        let token = sign(
            &json!({"sub": "admin", "iat": NOW, "exp": NOW + 3600, "nbf": NOW + 301}),
            SECRET,
            Algorithm::HS256,
        );
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), AuthError::Immature);

        // Usable once the clock (plus skew) reaches nbf.
        let claims = verifier().verify(&token, NOW + 1).unwrap();
        assert_eq!(claims.nbf, Some(NOW + 301));
        assert!(!claims.extra.contains_key("nbf"));
    }

    #[test]
    fn test_authenticate_missing_token() {
        assert_eq!(verifier().authenticate(None).unwrap_err(), AuthError::Missing);
    }

    #[test]
    fn test_authenticate_uses_wall_clock() {
        let now = chrono::Utc::now().timestamp();
        let token = SecretString::from(login_token(now, now + 3600));
        assert!(verifier().authenticate(Some(&token)).is_ok());

        let stale = SecretString::from(login_token(now - 7200, now - 3600));
        assert_eq!(
            verifier().authenticate(Some(&stale)).unwrap_err(),
            AuthError::Expired
        );
    }
}
