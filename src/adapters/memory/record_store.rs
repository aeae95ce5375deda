//! In-memory conversation and message store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{ConversationId, MessageId};
use crate::domain::{Conversation, ConversationMessage, NewMessage};
use crate::ports::{ConversationStore, ConversationStoreError};

/// Hash-map record store for tests and local development.
#[derive(Default)]
pub struct InMemoryRecordStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    messages: RwLock<HashMap<MessageId, ConversationMessage>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation, as the platform's REST side would have created.
    pub fn insert_conversation(&self, conversation: Conversation) {
        self.conversations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(conversation.id, conversation);
    }

    /// Seed an already-persisted message row.
    pub fn insert_message(&self, message: ConversationMessage) {
        self.messages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(message.id, message);
    }
}

#[async_trait]
impl ConversationStore for InMemoryRecordStore {
    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, ConversationStoreError> {
        let conversations = self.conversations.read().unwrap_or_else(|e| e.into_inner());
        Ok(conversations.get(&id).cloned())
    }

    async fn find_message(
        &self,
        id: MessageId,
    ) -> Result<Option<ConversationMessage>, ConversationStoreError> {
        let messages = self.messages.read().unwrap_or_else(|e| e.into_inner());
        Ok(messages.get(&id).cloned())
    }

    async fn create_message(
        &self,
        draft: NewMessage,
    ) -> Result<ConversationMessage, ConversationStoreError> {
        let message = draft.into_message();
        let mut messages = self.messages.write().unwrap_or_else(|e| e.into_inner());
        messages.insert(message.id, message.clone());
        Ok(message)
    }
}
