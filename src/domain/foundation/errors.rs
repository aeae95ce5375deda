//! Error types for the real-time core.

use thiserror::Error;

/// Failure taxonomy for room and call operations.
///
/// Every event handler converts one of these into an `error` frame sent to
/// the originating connection only; failures never propagate to other
/// connections or abort the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    /// The identity is not allowed into the requested room.
    #[error("Access denied")]
    AccessDenied,

    /// A referenced conversation, user, or message does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requested transition is illegal for the session's current state.
    #[error("Call session is already {0}")]
    StateConflict(&'static str),

    /// An external-store call failed. Logged with detail, surfaced
    /// generically.
    #[error("Internal error")]
    Internal(String),
}

impl RealtimeError {
    /// Creates an internal failure carrying operator-facing detail.
    pub fn internal(detail: impl Into<String>) -> Self {
        RealtimeError::Internal(detail.into())
    }

    /// Message safe to send to the client.
    ///
    /// `Internal` detail stays in the logs; the caller sees a generic line.
    pub fn client_message(&self) -> String {
        match self {
            RealtimeError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Authentication errors raised by the session validator.
///
/// None of these are fatal at connect time: the gateway maps every variant
/// to `Identity::Anonymous` and defers enforcement to room join.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for logging).
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but carries no usable subject or role.
    #[error("Token claims incomplete")]
    IncompleteClaims,

    /// The validator itself is unavailable (config, key material).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}
