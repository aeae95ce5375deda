//! Conversation store port.
//!
//! View of the external record store used for room authorization, read
//! receipts, and persisting messages sent in-band. The core never writes
//! conversations themselves.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{ConversationId, MessageId};
use crate::domain::{Conversation, ConversationMessage, NewMessage};

/// Errors raised by conversation store implementations.
#[derive(Debug, Error)]
pub enum ConversationStoreError {
    /// Underlying store call failed.
    #[error("Store error: {0}")]
    Database(String),
}

/// Resolves conversations and message rows from the record store.
///
/// # Contract
///
/// - `find_conversation` returns `Ok(None)` for an unknown id, reserving
///   `Err` for store faults
/// - `find_message` resolves an already-persisted message row; used to
///   route read receipts back to the sender
/// - `create_message` persists an in-band draft and returns the stored row
///   (id and timestamp assigned), which is what gets relayed
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up a conversation and its participant pair.
    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, ConversationStoreError>;

    /// Look up a persisted message row.
    async fn find_message(
        &self,
        id: MessageId,
    ) -> Result<Option<ConversationMessage>, ConversationStoreError>;

    /// Persist a draft sent over the chat channel and return the stored row.
    async fn create_message(
        &self,
        draft: NewMessage,
    ) -> Result<ConversationMessage, ConversationStoreError>;
}
