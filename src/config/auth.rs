//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration (platform-issued JWTs)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing key shared with the platform's auth service
    pub jwt_secret: SecretString,

    /// Expected token issuer; unchecked when unset
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected token audience; unchecked when unset
    #[serde(default)]
    pub audience: Option<String>,

    /// Cookie the gateway falls back to when no auth field or header is
    /// present
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Accept `userId`/`role` query parameters as identity without a token.
    /// Development only; validation rejects it in production.
    #[serde(default)]
    pub allow_dev_fallback: bool,
}

impl AuthConfig {
    /// Validate authentication configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_JWT_SECRET"));
        }
        if self.jwt_secret.expose_secret().len() < 32 {
            return Err(ValidationError::JwtSecretTooShort);
        }
        if *environment == Environment::Production && self.allow_dev_fallback {
            return Err(ValidationError::DevFallbackInProduction);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::new(String::new()),
            issuer: None,
            audience: None,
            cookie_name: default_cookie_name(),
            allow_dev_fallback: false,
        }
    }
}

fn default_cookie_name() -> String {
    "carelink_session".to_string()
}
