//! PostgreSQL implementation of ConversationStore.
//!
//! Conversations and messages live in tables the platform's REST side owns;
//! this adapter reads them for authorization and read receipts, and inserts
//! the rows for messages sent in-band.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{ConversationId, MessageId, Timestamp, UserId};
use crate::domain::{Conversation, ConversationMessage, MessageKind, NewMessage};
use crate::ports::{ConversationStore, ConversationStoreError};

/// PostgreSQL implementation of ConversationStore.
#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    /// Creates a new PostgresConversationStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, ConversationStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, doctor_id, patient_id
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            ConversationStoreError::Database(format!("Failed to fetch conversation: {}", e))
        })?;

        row.map(|row| row_to_conversation(&row)).transpose()
    }

    async fn find_message(
        &self,
        id: MessageId,
    ) -> Result<Option<ConversationMessage>, ConversationStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, conversation_id, content,
                   kind, file_id, delivered, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            ConversationStoreError::Database(format!("Failed to fetch message: {}", e))
        })?;

        row.map(|row| row_to_message(&row)).transpose()
    }

    async fn create_message(
        &self,
        draft: NewMessage,
    ) -> Result<ConversationMessage, ConversationStoreError> {
        let message = draft.into_message();

        sqlx::query(
            r#"
            INSERT INTO messages (
                id, sender_id, receiver_id, conversation_id, content,
                kind, file_id, delivered, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.sender_id.as_str())
        .bind(message.receiver_id.as_str())
        .bind(message.conversation_id.as_ref().map(|c| *c.as_uuid()))
        .bind(&message.content)
        .bind(kind_to_str(message.kind))
        .bind(message.file_id.as_deref())
        .bind(message.delivered)
        .bind(message.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            ConversationStoreError::Database(format!("Failed to insert message: {}", e))
        })?;

        Ok(message)
    }
}

fn row_to_conversation(row: &PgRow) -> Result<Conversation, ConversationStoreError> {
    let id: uuid::Uuid = get(row, "id")?;
    let doctor_id: String = get(row, "doctor_id")?;
    let patient_id: String = get(row, "patient_id")?;

    Ok(Conversation::new(
        ConversationId::from_uuid(id),
        UserId::new(doctor_id),
        UserId::new(patient_id),
    ))
}

fn row_to_message(row: &PgRow) -> Result<ConversationMessage, ConversationStoreError> {
    let id: uuid::Uuid = get(row, "id")?;
    let sender_id: String = get(row, "sender_id")?;
    let receiver_id: String = get(row, "receiver_id")?;
    let conversation_id: Option<uuid::Uuid> = get(row, "conversation_id")?;
    let content: String = get(row, "content")?;
    let kind: String = get(row, "kind")?;
    let file_id: Option<String> = get(row, "file_id")?;
    let delivered: bool = get(row, "delivered")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(row, "created_at")?;

    Ok(ConversationMessage {
        id: MessageId::from_uuid(id),
        sender_id: UserId::new(sender_id),
        receiver_id: UserId::new(receiver_id),
        conversation_id: conversation_id.map(ConversationId::from_uuid),
        content,
        kind: kind_from_str(&kind)?,
        file_id,
        delivered,
        created_at: Timestamp::from_datetime(created_at),
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, ConversationStoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(|e| {
        ConversationStoreError::Database(format!("Invalid column '{}': {}", column, e))
    })
}

fn kind_to_str(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "text",
        MessageKind::Image => "image",
        MessageKind::File => "file",
    }
}

fn kind_from_str(s: &str) -> Result<MessageKind, ConversationStoreError> {
    match s {
        "text" => Ok(MessageKind::Text),
        "image" => Ok(MessageKind::Image),
        "file" => Ok(MessageKind::File),
        other => Err(ConversationStoreError::Database(format!(
            "Unknown message kind: {}",
            other
        ))),
    }
}
