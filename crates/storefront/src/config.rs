//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COPPERBAY_API_BASE_URL` - Base URL of the shop REST API
//! - `COPPERBAY_API_TOKEN` - Storefront API access token
//!
//! ## Optional
//! - `COPPERBAY_API_TIMEOUT_SECS` - Request timeout in seconds (default: 10)

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: &str = "10";
const MIN_TOKEN_LENGTH: usize = 16;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the shop REST API (e.g., <https://api.copperbay.shop/v1/>)
    pub api_base_url: Url,
    /// Storefront API access token
    pub api_token: SecretString,
    /// Timeout applied to every gateway request
    pub request_timeout: Duration,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, length).
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = get_required_env("COPPERBAY_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("COPPERBAY_API_BASE_URL".to_string(), e.to_string())
            })?;

        let api_token = get_validated_secret("COPPERBAY_API_TOKEN")?;

        let timeout_secs = get_env_or_default("COPPERBAY_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("COPPERBAY_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_base_url,
            api_token,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required environment variable as a validated secret.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    let secret = SecretString::from(value);
    validate_token(&secret, key)?;
    Ok(secret)
}

/// Validate that an API token is not a placeholder and meets minimum length.
fn validate_token(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();

    if value.len() < MIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_TOKEN_LENGTH} characters"),
        ));
    }

    let lowered = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lowered.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("contains placeholder pattern '{pattern}'"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn test_validate_token_accepts_opaque_value() {
        assert!(validate_token(&secret("kq81x0f7mz44p1nb29aa"), "TOKEN").is_ok());
    }

    #[test]
    fn test_validate_token_rejects_short_value() {
        let err = validate_token(&secret("short"), "TOKEN").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_token_rejects_placeholder() {
        let err = validate_token(&secret("your-api-token-goes-here"), "TOKEN").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = StoreConfig {
            api_base_url: "https://api.copperbay.shop/v1/"
                .parse()
                .expect("static url"),
            api_token: secret("kq81x0f7mz44p1nb29aa"),
            request_timeout: Duration::from_secs(10),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("kq81x0f7mz44p1nb29aa"));
    }
}
