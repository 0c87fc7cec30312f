//! JWT claims structure.
//!
//! Contains the claims extracted from verified tokens. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Claims carried by an identity-service token.
///
/// Unknown claims are preserved in `extra` so the decoded set is returned
/// unchanged to callers.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username) - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Optional role granted at login (e.g. "admin").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Any further claims, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("role", &self.role)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn admin_claims() -> Claims {
        Claims {
            sub: "secret-user-id".to_string(),
            iat: 1_700_000_000,
            exp: Some(1_700_043_200),
            nbf: None,
            role: Some("admin".to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let debug_str = format!("{:?}", admin_claims());

        assert!(
            !debug_str.contains("secret-user-id"),
            "Debug output should not contain actual sub value"
        );
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_claims_keep_unknown_fields() {
        let json = r#"{"sub":"alice","iat":1,"exp":2,"room_hint":"abc123","n":5}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.extra.get("room_hint"), Some(&Value::from("abc123")));
        assert_eq!(claims.extra.get("n"), Some(&Value::from(5)));

        let round_trip: Value = serde_json::to_value(&claims).unwrap();
        assert_eq!(round_trip, serde_json::from_str::<Value>(json).unwrap());
    }

    #[test]
    fn test_claims_without_optional_fields() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"alice","iat":1}"#).unwrap();
        assert!(claims.exp.is_none());
        assert!(claims.nbf.is_none());
        assert!(claims.role.is_none());

        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("exp"));
        assert!(!json.contains("role"));
    }

    #[test]
    fn test_claims_require_subject() {
        let result = serde_json::from_str::<Claims>(r#"{"iat":1,"exp":2}"#);
        assert!(result.is_err());
    }
}
