//! Call session repository port.
//!
//! The one port through which the lifecycle coordinator mutates state. All
//! operations are conditional at the storage layer so they stay correct
//! when several server processes race on the same conversation:
//!
//! - `find_or_create_active` must be a true atomic find-or-create (e.g. a
//!   partial unique index on "conversation + non-terminal" plus
//!   `INSERT .. ON CONFLICT DO NOTHING`), never check-then-create
//! - the `try_*` transitions are compare-and-set updates
//!   (`UPDATE .. WHERE state = ..`) that report whether they won

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{CallSessionId, ConversationId, Timestamp};
use crate::domain::CallSession;

/// Errors raised by call session repository implementations.
#[derive(Debug, Error)]
pub enum CallSessionRepositoryError {
    /// Underlying store call failed.
    #[error("Store error: {0}")]
    Database(String),
}

/// Result of an atomic find-or-create.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session: CallSession,

    /// True when this call created the session, false when an existing
    /// non-terminal session was found.
    pub created: bool,
}

/// Persists call sessions in the external record store.
#[async_trait]
pub trait CallSessionRepository: Send + Sync {
    /// Return the conversation's non-terminal session, creating a `Pending`
    /// one atomically when none exists.
    ///
    /// `room_id` is only used when creating; an existing session keeps the
    /// room it was created with.
    async fn find_or_create_active(
        &self,
        conversation_id: ConversationId,
        room_id: &str,
    ) -> Result<ActiveSession, CallSessionRepositoryError>;

    /// Return the conversation's current non-terminal session, if any.
    async fn find_active(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError>;

    /// Return the conversation's most recently created session in any
    /// state. Used to report the right conflict when ending a call that
    /// already closed.
    async fn find_latest(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError>;

    /// Pending -> InProgress with `started_at = at`.
    ///
    /// Returns the updated session, or `None` when the session was not in
    /// `Pending` (someone else already started or closed it).
    async fn try_start(
        &self,
        id: CallSessionId,
        at: Timestamp,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError>;

    /// InProgress -> Completed with `ended_at = at`.
    ///
    /// Returns the updated session, or `None` on a lost race / terminal
    /// session.
    async fn try_end(
        &self,
        id: CallSessionId,
        at: Timestamp,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError>;

    /// Any non-terminal state -> Cancelled.
    ///
    /// Returns the updated session, or `None` when already terminal.
    async fn try_cancel(
        &self,
        id: CallSessionId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError>;
}
