//! Notification channel: a push-only namespace.
//!
//! Clients only join their personal room; everything else arrives through
//! the push API called by the collaborator that persisted the notification.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{Identity, NotificationId, RealtimeError, UserId};
use crate::domain::Notification;

use super::handler::Channel;
use super::messages::{NotificationClientEvent, NotificationServerEvent};
use super::rooms::{ConnectionId, RoomId, RoomManager};

pub struct NotificationChannel {
    rooms: Arc<RoomManager<NotificationServerEvent>>,
}

impl NotificationChannel {
    pub fn new(rooms: Arc<RoomManager<NotificationServerEvent>>) -> Self {
        Self { rooms }
    }

    /// Deliver an already-persisted notification to its recipient.
    pub async fn push(&self, notification: Notification) {
        let recipient = notification.recipient_id.clone();
        self.rooms
            .send_to_user(
                &recipient,
                NotificationServerEvent::NewNotification(notification),
            )
            .await;
    }

    /// Tell the recipient's other devices a notification was read.
    pub async fn push_read(&self, recipient: &UserId, notification_id: NotificationId) {
        self.rooms
            .send_to_user(
                recipient,
                NotificationServerEvent::NotificationRead { notification_id },
            )
            .await;
    }
}

#[async_trait]
impl Channel for NotificationChannel {
    type ClientEvent = NotificationClientEvent;
    type ServerEvent = NotificationServerEvent;

    fn rooms(&self) -> &RoomManager<NotificationServerEvent> {
        &self.rooms
    }

    fn error_event(message: String) -> NotificationServerEvent {
        NotificationServerEvent::Error { message }
    }

    async fn handle(
        &self,
        conn: ConnectionId,
        _identity: &Identity,
        event: NotificationClientEvent,
    ) -> Result<(), RealtimeError> {
        match event {
            NotificationClientEvent::JoinUser { user_id } => {
                self.rooms.join(conn, RoomId::Personal(user_id)).await?;
                self.rooms
                    .send_to_connection(conn, NotificationServerEvent::Joined)
                    .await;
                Ok(())
            }
        }
    }
}
