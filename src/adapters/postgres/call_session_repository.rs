//! PostgreSQL implementation of CallSessionRepository.
//!
//! The "at most one non-terminal session per conversation" invariant is
//! enforced by a partial unique index:
//!
//! ```sql
//! CREATE UNIQUE INDEX call_sessions_one_active
//!     ON call_sessions (conversation_id)
//!     WHERE state IN ('pending', 'in_progress');
//! ```
//!
//! `find_or_create_active` inserts with `ON CONFLICT DO NOTHING` against
//! that index and falls back to selecting the winner, so concurrent
//! requests from any number of server processes converge on one row. The
//! transitions are single `UPDATE .. WHERE state = ..` statements whose
//! affected-row count reports whether the compare-and-set won.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{CallSessionId, ConversationId, Timestamp};
use crate::domain::{CallSession, CallSessionState};
use crate::ports::{ActiveSession, CallSessionRepository, CallSessionRepositoryError};

const SESSION_COLUMNS: &str =
    "id, conversation_id, room_id, state, started_at, ended_at, created_at";

/// PostgreSQL implementation of CallSessionRepository.
#[derive(Clone)]
pub struct PostgresCallSessionRepository {
    pool: PgPool,
}

impl PostgresCallSessionRepository {
    /// Creates a new PostgresCallSessionRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallSessionRepository for PostgresCallSessionRepository {
    async fn find_or_create_active(
        &self,
        conversation_id: ConversationId,
        room_id: &str,
    ) -> Result<ActiveSession, CallSessionRepositoryError> {
        // Two rounds cover the window where the conflicting session
        // terminates between our insert and select.
        for _ in 0..2 {
            let session = CallSession::pending(conversation_id, room_id);
            let result = sqlx::query(
                r#"
                INSERT INTO call_sessions (
                    id, conversation_id, room_id, state, created_at
                ) VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (conversation_id)
                    WHERE state IN ('pending', 'in_progress')
                    DO NOTHING
                "#,
            )
            .bind(session.id.as_uuid())
            .bind(conversation_id.as_uuid())
            .bind(&session.room_id)
            .bind(session.state.as_str())
            .bind(session.created_at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                CallSessionRepositoryError::Database(format!("Failed to insert session: {}", e))
            })?;

            if result.rows_affected() == 1 {
                return Ok(ActiveSession {
                    session,
                    created: true,
                });
            }

            if let Some(existing) = self.find_active(conversation_id).await? {
                return Ok(ActiveSession {
                    session: existing,
                    created: false,
                });
            }
        }

        Err(CallSessionRepositoryError::Database(
            "Lost the find-or-create race twice".to_string(),
        ))
    }

    async fn find_active(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM call_sessions
            WHERE conversation_id = $1 AND state IN ('pending', 'in_progress')
            "#
        ))
        .bind(conversation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            CallSessionRepositoryError::Database(format!("Failed to fetch session: {}", e))
        })?;

        row.map(|row| row_to_session(&row)).transpose()
    }

    async fn find_latest(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM call_sessions
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(conversation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            CallSessionRepositoryError::Database(format!("Failed to fetch session: {}", e))
        })?;

        row.map(|row| row_to_session(&row)).transpose()
    }

    async fn try_start(
        &self,
        id: CallSessionId,
        at: Timestamp,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE call_sessions
            SET state = 'in_progress', started_at = $2
            WHERE id = $1 AND state = 'pending'
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            CallSessionRepositoryError::Database(format!("Failed to start session: {}", e))
        })?;

        row.map(|row| row_to_session(&row)).transpose()
    }

    async fn try_end(
        &self,
        id: CallSessionId,
        at: Timestamp,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE call_sessions
            SET state = 'completed', ended_at = $2
            WHERE id = $1 AND state = 'in_progress'
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            CallSessionRepositoryError::Database(format!("Failed to end session: {}", e))
        })?;

        row.map(|row| row_to_session(&row)).transpose()
    }

    async fn try_cancel(
        &self,
        id: CallSessionId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE call_sessions
            SET state = 'cancelled'
            WHERE id = $1 AND state IN ('pending', 'in_progress')
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            CallSessionRepositoryError::Database(format!("Failed to cancel session: {}", e))
        })?;

        row.map(|row| row_to_session(&row)).transpose()
    }
}

fn row_to_session(row: &PgRow) -> Result<CallSession, CallSessionRepositoryError> {
    let id: uuid::Uuid = get(row, "id")?;
    let conversation_id: uuid::Uuid = get(row, "conversation_id")?;
    let room_id: String = get(row, "room_id")?;
    let state: String = get(row, "state")?;
    let started_at: Option<chrono::DateTime<chrono::Utc>> = get(row, "started_at")?;
    let ended_at: Option<chrono::DateTime<chrono::Utc>> = get(row, "ended_at")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(row, "created_at")?;

    let state = CallSessionState::parse(&state).ok_or_else(|| {
        CallSessionRepositoryError::Database(format!("Unknown session state: {}", state))
    })?;

    Ok(CallSession {
        id: CallSessionId::from_uuid(id),
        conversation_id: ConversationId::from_uuid(conversation_id),
        room_id,
        state,
        started_at: started_at.map(Timestamp::from_datetime),
        ended_at: ended_at.map(Timestamp::from_datetime),
        created_at: Timestamp::from_datetime(created_at),
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, CallSessionRepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(|e| {
        CallSessionRepositoryError::Database(format!("Invalid column '{}': {}", column, e))
    })
}
