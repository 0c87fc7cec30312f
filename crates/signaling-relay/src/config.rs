//! Signaling relay configuration.
//!
//! Configuration is loaded from environment variables. The JWT secret is
//! redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP/WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default service name reported by `GET /`.
pub const DEFAULT_APP_NAME: &str = "Videocalls API";

/// Default token lifetime in minutes, measured from `iat`.
pub const DEFAULT_JWT_EXPIRES_MIN: u64 = 720;

/// Default per-peer outbound queue depth.
pub const DEFAULT_PEER_QUEUE_CAPACITY: usize = 256;

/// Default maximum inbound WebSocket message size (64KB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Signaling relay configuration.
#[derive(Clone)]
pub struct Config {
    /// HS256 secret shared with the identity service.
    pub jwt_secret: SecretString,

    /// Token lifetime counted from `iat` (default: 720 minutes).
    pub token_ttl: Duration,

    /// Tolerance for `iat` values ahead of the local clock (default: 300s).
    pub clock_skew: Duration,

    /// Bind address (default: "0.0.0.0:8000").
    pub bind_address: String,

    /// Name reported by the root endpoint.
    pub app_name: String,

    /// Outbound queue depth per peer before sends fail with backpressure.
    pub peer_queue_capacity: usize,

    /// Largest inbound WebSocket message accepted.
    pub max_message_bytes: usize,
}

/// Custom Debug implementation that redacts the JWT secret.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("clock_skew", &self.clock_skew)
            .field("bind_address", &self.bind_address)
            .field("app_name", &self.app_name)
            .field("peer_queue_capacity", &self.peer_queue_capacity)
            .field("max_message_bytes", &self.max_message_bytes)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret = vars
            .get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;
        let jwt_secret = SecretString::from(jwt_secret.clone());

        let expires_min: u64 = parse_or(vars, "JWT_EXPIRES_MIN", DEFAULT_JWT_EXPIRES_MIN)?;
        if expires_min == 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_EXPIRES_MIN must be greater than 0".to_string(),
            ));
        }
        let token_ttl = Duration::from_secs(expires_min.saturating_mul(60));

        let clock_skew_seconds: u64 =
            parse_or(vars, "RELAY_CLOCK_SKEW_SECONDS", DEFAULT_CLOCK_SKEW.as_secs())?;
        let clock_skew = Duration::from_secs(clock_skew_seconds);
        if clock_skew > MAX_CLOCK_SKEW {
            return Err(ConfigError::InvalidValue(format!(
                "RELAY_CLOCK_SKEW_SECONDS must be at most {}",
                MAX_CLOCK_SKEW.as_secs()
            )));
        }

        let bind_address = vars
            .get("RELAY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let app_name = vars
            .get("RELAY_APP_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let peer_queue_capacity: usize =
            parse_or(vars, "RELAY_PEER_QUEUE_CAPACITY", DEFAULT_PEER_QUEUE_CAPACITY)?;
        if peer_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "RELAY_PEER_QUEUE_CAPACITY must be greater than 0".to_string(),
            ));
        }

        let max_message_bytes: usize =
            parse_or(vars, "RELAY_MAX_MESSAGE_BYTES", DEFAULT_MAX_MESSAGE_BYTES)?;

        Ok(Config {
            jwt_secret,
            token_ttl,
            clock_skew,
            bind_address,
            app_name,
            peer_queue_capacity,
            max_message_bytes,
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key} must be a number, got {raw:?}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([("JWT_SECRET".to_string(), "dev-secret".to_string())])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.jwt_secret.expose_secret(), "dev-secret");
        assert_eq!(config.token_ttl, Duration::from_secs(720 * 60));
        assert_eq!(config.clock_skew, DEFAULT_CLOCK_SKEW);
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert_eq!(config.peer_queue_capacity, DEFAULT_PEER_QUEUE_CAPACITY);
        assert_eq!(config.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("JWT_EXPIRES_MIN".to_string(), "15".to_string());
        vars.insert("RELAY_CLOCK_SKEW_SECONDS".to_string(), "30".to_string());
        vars.insert("RELAY_BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("RELAY_APP_NAME".to_string(), "Clinic Calls".to_string());
        vars.insert("RELAY_PEER_QUEUE_CAPACITY".to_string(), "8".to_string());
        vars.insert("RELAY_MAX_MESSAGE_BYTES".to_string(), "1024".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.token_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.clock_skew, Duration::from_secs(30));
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.app_name, "Clinic Calls");
        assert_eq!(config.peer_queue_capacity, 8);
        assert_eq!(config.max_message_bytes, 1024);
    }

    #[test]
    fn test_from_vars_missing_secret() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWT_SECRET"));
    }

    #[test]
    fn test_from_vars_empty_secret_is_missing() {
        let vars = HashMap::from([("JWT_SECRET".to_string(), String::new())]);
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_from_vars_rejects_non_numeric_ttl() {
        let mut vars = base_vars();
        vars.insert("JWT_EXPIRES_MIN".to_string(), "twelve".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("JWT_EXPIRES_MIN")));
    }

    #[test]
    fn test_from_vars_rejects_zero_ttl_and_queue() {
        let mut vars = base_vars();
        vars.insert("JWT_EXPIRES_MIN".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));

        let mut vars = base_vars();
        vars.insert("RELAY_PEER_QUEUE_CAPACITY".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_from_vars_rejects_excessive_clock_skew() {
        let mut vars = base_vars();
        vars.insert("RELAY_CLOCK_SKEW_SECONDS".to_string(), "601".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("dev-secret"));
    }
}
