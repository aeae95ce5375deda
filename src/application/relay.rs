//! Message relay: fan-out of chat messages to their rooms.
//!
//! Two entry points converge on the same delivery rule:
//!
//! - `relay_from_connection` handles the in-band `send-message` event: the
//!   draft is persisted through the record store first, then the stored row
//!   is fanned out, and the sending connection gets a `message-sent` ack.
//! - `relay_stored` is called out-of-band by the collaborator that already
//!   persisted a row (the platform's REST write path) and performs fan-out
//!   only.
//!
//! Fan-out: `new-message` to the receiver's personal room, plus
//! `appointment-message` to the conversation room when the message
//! references one. Empty target rooms are a silent no-op; the row stays
//! retrievable through the record store. The relay never deduplicates:
//! each call corresponds to exactly one created row.

use std::sync::Arc;

use tracing::debug;

use crate::adapters::websocket::{ChatServerEvent, ConnectionId, RoomId, RoomManager};
use crate::domain::foundation::{MessageId, RealtimeError, UserId};
use crate::domain::{ConversationMessage, NewMessage};
use crate::ports::ConversationStore;

pub struct MessageRelay {
    rooms: Arc<RoomManager<ChatServerEvent>>,
    store: Arc<dyn ConversationStore>,
}

impl MessageRelay {
    pub fn new(rooms: Arc<RoomManager<ChatServerEvent>>, store: Arc<dyn ConversationStore>) -> Self {
        Self { rooms, store }
    }

    /// In-band entry point: persist the draft, fan out the stored row, ack
    /// the sending connection.
    ///
    /// The sender id always comes from the connection's identity, never
    /// from the frame. A draft referencing a conversation is only accepted
    /// from one of its participants.
    pub async fn relay_from_connection(
        &self,
        conn: ConnectionId,
        sender: &UserId,
        mut draft: NewMessage,
    ) -> Result<(), RealtimeError> {
        draft.sender_id = sender.clone();

        if let Some(conversation_id) = draft.conversation_id {
            let conversation = self
                .store
                .find_conversation(conversation_id)
                .await
                .map_err(|e| RealtimeError::internal(e.to_string()))?
                .ok_or(RealtimeError::NotFound("Conversation"))?;
            if !conversation.is_participant(sender) {
                return Err(RealtimeError::AccessDenied);
            }
        }

        let message = self
            .store
            .create_message(draft)
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?;

        self.fan_out(&message).await;
        self.rooms
            .send_to_connection(conn, ChatServerEvent::MessageSent(message))
            .await;
        Ok(())
    }

    /// Out-of-band entry point for rows the collaborator already persisted.
    pub async fn relay_stored(&self, message: ConversationMessage) {
        self.fan_out(&message).await;
    }

    /// Resolve a read receipt and route it to the message's sender.
    pub async fn mark_read(
        &self,
        message_id: MessageId,
        read_by: &UserId,
    ) -> Result<(), RealtimeError> {
        let message = self
            .store
            .find_message(message_id)
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?
            .ok_or(RealtimeError::NotFound("Message"))?;

        self.rooms
            .send_to_user(
                &message.sender_id,
                ChatServerEvent::MessageRead {
                    message_id,
                    read_by: read_by.clone(),
                },
            )
            .await;
        Ok(())
    }

    async fn fan_out(&self, message: &ConversationMessage) {
        debug!(
            message_id = %message.id,
            receiver = %message.receiver_id,
            conversation = ?message.conversation_id,
            "relaying message"
        );

        self.rooms
            .send_to_user(
                &message.receiver_id,
                ChatServerEvent::NewMessage(message.clone()),
            )
            .await;

        if let Some(conversation_id) = message.conversation_id {
            self.rooms
                .broadcast(
                    &RoomId::Conversation(conversation_id),
                    ChatServerEvent::AppointmentMessage(message.clone()),
                )
                .await;
        }
    }
}
