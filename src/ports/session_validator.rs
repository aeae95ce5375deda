//! Session validator port for connection authentication.
//!
//! The gateway hands every credential it finds (auth field, bearer header,
//! cookie) to this port. Implementations validate the token and map its
//! claims to the domain `AuthenticatedUser`; they never see transport
//! details.
//!
//! # Contract
//!
//! Implementations must:
//! - Return the authenticated user for a valid, unexpired token
//! - Return `AuthError::TokenExpired` / `AuthError::InvalidToken` for bad
//!   tokens (the gateway degrades both to `Anonymous`)
//! - Return `AuthError::ServiceUnavailable` only for validator-side faults

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates a bearer token and resolves the user behind it.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token string.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
