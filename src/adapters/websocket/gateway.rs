//! Connection gateway: credential extraction and identity resolution.
//!
//! Authentication here never rejects a connection. The gateway tries each
//! credential source in order (query token, bearer header, session cookie),
//! validates the first one found, and degrades to `Identity::Anonymous` on
//! any failure. Enforcement happens later, at room join, where an anonymous
//! identity can enter no room.
//!
//! In development the gateway may additionally accept bare `userId`/`role`
//! query parameters as identity; configuration validation refuses that flag
//! in production.

use std::sync::Arc;

use http::HeaderMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::domain::foundation::{Identity, UserId, UserRole};
use crate::ports::SessionValidator;

/// Query parameters accepted on the websocket handshake.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    /// Bearer token in the query string (browser websocket clients cannot
    /// set headers).
    pub token: Option<String>,

    /// Dev fallback identity, honored only when configured.
    pub user_id: Option<String>,

    /// Dev fallback role; defaults to patient when omitted.
    pub role: Option<UserRole>,
}

/// Resolves the identity of an incoming connection.
pub struct ConnectionGateway {
    validator: Arc<dyn SessionValidator>,
    cookie_name: String,
    allow_dev_fallback: bool,
}

impl ConnectionGateway {
    pub fn new(validator: Arc<dyn SessionValidator>, auth: &AuthConfig) -> Self {
        Self {
            validator,
            cookie_name: auth.cookie_name.clone(),
            allow_dev_fallback: auth.allow_dev_fallback,
        }
    }

    /// Resolve the handshake's credentials to an identity.
    ///
    /// Infallible: every failure path lands on `Identity::Anonymous`.
    pub async fn resolve(&self, params: &ConnectParams, headers: &HeaderMap) -> Identity {
        if let Some(token) = self.extract_token(params, headers) {
            match self.validator.validate(&token).await {
                Ok(user) => {
                    debug!(user_id = %user.id, role = %user.role, "connection authenticated");
                    return user.into_identity();
                }
                Err(err) => {
                    warn!(error = %err, "token validation failed, degrading to anonymous");
                    return Identity::Anonymous;
                }
            }
        }

        if self.allow_dev_fallback {
            if let Some(user_id) = &params.user_id {
                let role = params.role.unwrap_or(UserRole::Patient);
                debug!(user_id = %user_id, "dev fallback identity accepted");
                return Identity::authenticated(UserId::new(user_id), role);
            }
        }

        debug!("no credentials presented, connection is anonymous");
        Identity::Anonymous
    }

    /// Credential source order: query token, bearer header, session cookie.
    fn extract_token(&self, params: &ConnectParams, headers: &HeaderMap) -> Option<String> {
        if let Some(token) = &params.token {
            if !token.is_empty() {
                return Some(token.clone());
            }
        }

        if let Some(value) = headers.get(http::header::AUTHORIZATION) {
            if let Ok(value) = value.to_str() {
                if let Some(token) = value.strip_prefix("Bearer ") {
                    return Some(token.to_string());
                }
            }
        }

        if let Some(value) = headers.get(http::header::COOKIE) {
            if let Ok(value) = value.to_str() {
                return cookie_value(value, &self.cookie_name).map(str::to_string);
            }
        }

        None
    }
}

/// Pull one cookie's value out of a `Cookie:` header line.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
