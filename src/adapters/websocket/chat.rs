//! Chat channel: personal and conversation rooms, message relay entry,
//! read receipts, typing indicators.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::MessageRelay;
use crate::domain::foundation::{Identity, RealtimeError, UserId};
use crate::domain::NewMessage;

use super::handler::Channel;
use super::messages::{ChatClientEvent, ChatServerEvent};
use super::rooms::{ConnectionId, RoomId, RoomManager};

pub struct ChatChannel {
    rooms: Arc<RoomManager<ChatServerEvent>>,
    relay: Arc<MessageRelay>,
}

impl ChatChannel {
    pub fn new(rooms: Arc<RoomManager<ChatServerEvent>>, relay: Arc<MessageRelay>) -> Self {
        Self { rooms, relay }
    }

    async fn typing(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        receiver_id: UserId,
        conversation_id: Option<crate::domain::foundation::ConversationId>,
        is_typing: bool,
    ) -> Result<(), RealtimeError> {
        let user = identity.user_id().ok_or(RealtimeError::AccessDenied)?.clone();

        self.rooms
            .send_to_user(
                &receiver_id,
                ChatServerEvent::UserTyping {
                    user_id: user.clone(),
                    is_typing,
                },
            )
            .await;

        if let Some(conversation_id) = conversation_id {
            self.rooms
                .broadcast_excluding(
                    &RoomId::Conversation(conversation_id),
                    conn,
                    ChatServerEvent::AppointmentTyping {
                        user_id: user,
                        is_typing,
                    },
                )
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for ChatChannel {
    type ClientEvent = ChatClientEvent;
    type ServerEvent = ChatServerEvent;

    fn rooms(&self) -> &RoomManager<ChatServerEvent> {
        &self.rooms
    }

    fn error_event(message: String) -> ChatServerEvent {
        ChatServerEvent::Error { message }
    }

    async fn handle(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        event: ChatClientEvent,
    ) -> Result<(), RealtimeError> {
        match event {
            ChatClientEvent::JoinUser { user_id } => {
                self.rooms
                    .join(conn, RoomId::Personal(user_id.clone()))
                    .await?;
                let role = identity.role().ok_or(RealtimeError::AccessDenied)?;
                self.rooms
                    .send_to_connection(conn, ChatServerEvent::Joined { user_id, role })
                    .await;
                Ok(())
            }

            ChatClientEvent::JoinAppointment { conversation_id } => {
                self.rooms
                    .join(conn, RoomId::Conversation(conversation_id))
                    .await?;
                self.rooms
                    .send_to_connection(
                        conn,
                        ChatServerEvent::AppointmentJoined { conversation_id },
                    )
                    .await;
                Ok(())
            }

            ChatClientEvent::SendMessage {
                receiver_id,
                conversation_id,
                content,
                kind,
                file_id,
            } => {
                let sender = identity.user_id().ok_or(RealtimeError::AccessDenied)?;
                let draft = NewMessage {
                    sender_id: sender.clone(),
                    receiver_id,
                    conversation_id,
                    content,
                    kind,
                    file_id,
                };
                self.relay.relay_from_connection(conn, sender, draft).await
            }

            ChatClientEvent::MarkRead(message_id) => {
                let reader = identity.user_id().ok_or(RealtimeError::AccessDenied)?;
                self.relay.mark_read(message_id, reader).await
            }

            ChatClientEvent::TypingStart {
                receiver_id,
                conversation_id,
            } => {
                self.typing(conn, identity, receiver_id, conversation_id, true)
                    .await
            }

            ChatClientEvent::TypingStop {
                receiver_id,
                conversation_id,
            } => {
                self.typing(conn, identity, receiver_id, conversation_id, false)
                    .await
            }
        }
    }
}
