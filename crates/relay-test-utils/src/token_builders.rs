//! Builder for signed test tokens
//!
//! Produces HS256 tokens shaped like the identity service's login tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for creating signed test JWTs
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new("dev-secret")
///     .for_user("admin")
///     .with_role("admin")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    secret: String,
    algorithm: Algorithm,
    sub: Option<String>,
    role: Option<String>,
    iat: i64,
    exp: Option<i64>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a builder signing with `secret`, valid for one hour from now.
    pub fn new(secret: &str) -> Self {
        let now = Utc::now();
        Self {
            secret: secret.to_string(),
            algorithm: Algorithm::HS256,
            sub: Some("test-subject".to_string()),
            role: None,
            iat: now.timestamp(),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            extra: Map::new(),
        }
    }

    /// Set the subject (username)
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Omit the `sub` claim entirely
    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Omit the `exp` claim (lifetime then comes from `iat` + TTL only)
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Add an arbitrary claim
    pub fn with_claim(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Sign with a different secret than the server's
    pub fn signed_with(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// Sign with a different HMAC algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The claim set as JSON
    pub fn claims(&self) -> Value {
        let mut claims = self.extra.clone();
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(role) = &self.role {
            claims.insert("role".to_string(), json!(role));
        }
        Value::Object(claims)
    }

    /// Build the signed compact JWT
    pub fn build(self) -> String {
        encode(
            &Header::new(self.algorithm),
            &self.claims(),
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("test token should encode")
    }

    /// Build an unsigned token declaring `"alg":"none"`
    pub fn build_unsigned(self) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(self.claims().to_string());
        format!("{header}.{payload}.")
    }
}
