//! Call-signaling channel: session joins, stateless negotiation relay and
//! in-call presence events.
//!
//! The signaling relay forwards offer/answer/candidate payloads verbatim to
//! the target's personal room, stamped with the sending identity. Nothing
//! is persisted and nothing is retried; ordering holds per (sender, target)
//! pair only. In-call toggles (mute, screen share, recording, link quality)
//! broadcast to the rest of the connection's call room.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::application::CallLifecycleCoordinator;
use crate::domain::foundation::{Identity, RealtimeError, UserId};

use super::handler::Channel;
use super::messages::{CallClientEvent, CallServerEvent, SignalKind};
use super::rooms::{ConnectionId, RemovedConnection, RoomId, RoomManager};

pub struct CallChannel {
    rooms: Arc<RoomManager<CallServerEvent>>,
    lifecycle: Arc<CallLifecycleCoordinator>,
}

impl CallChannel {
    pub fn new(
        rooms: Arc<RoomManager<CallServerEvent>>,
        lifecycle: Arc<CallLifecycleCoordinator>,
    ) -> Self {
        Self { rooms, lifecycle }
    }

    /// The call room this connection is currently in.
    async fn call_room_of(&self, conn: ConnectionId) -> Result<RoomId, RealtimeError> {
        self.rooms
            .rooms_of(conn)
            .await
            .into_iter()
            .find(|room| room.is_call())
            .ok_or(RealtimeError::NotFound("Call room"))
    }

    /// Verbatim forward to the target's personal room. An absent target is
    /// a silent drop; renegotiation is the application layer's problem.
    async fn relay_signal(
        &self,
        identity: &Identity,
        kind: SignalKind,
        target: UserId,
        payload: Value,
    ) -> Result<(), RealtimeError> {
        let from = identity.user_id().ok_or(RealtimeError::AccessDenied)?.clone();
        debug!(from = %from, target = %target, kind = ?kind, "relaying signal");

        let event = match kind {
            SignalKind::Offer => CallServerEvent::Offer {
                from_user_id: from,
                payload,
            },
            SignalKind::Answer => CallServerEvent::Answer {
                from_user_id: from,
                payload,
            },
            SignalKind::IceCandidate => CallServerEvent::IceCandidate {
                from_user_id: from,
                payload,
            },
        };
        self.rooms.send_to_user(&target, event).await;
        Ok(())
    }

    /// Broadcast an in-call presence event to everyone else in the
    /// connection's call room.
    async fn broadcast_in_call<F>(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        make_event: F,
    ) -> Result<(), RealtimeError>
    where
        F: FnOnce(UserId) -> CallServerEvent,
    {
        let user = identity.user_id().ok_or(RealtimeError::AccessDenied)?.clone();
        let room = self.call_room_of(conn).await?;
        self.rooms
            .broadcast_excluding(&room, conn, make_event(user))
            .await;
        Ok(())
    }
}

#[async_trait]
impl Channel for CallChannel {
    type ClientEvent = CallClientEvent;
    type ServerEvent = CallServerEvent;

    fn rooms(&self) -> &RoomManager<CallServerEvent> {
        &self.rooms
    }

    fn error_event(message: String) -> CallServerEvent {
        CallServerEvent::Error { message }
    }

    async fn handle(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        event: CallClientEvent,
    ) -> Result<(), RealtimeError> {
        match event {
            CallClientEvent::JoinUser { user_id } => {
                self.rooms.join(conn, RoomId::Personal(user_id)).await?;
                self.rooms
                    .send_to_connection(conn, CallServerEvent::Joined)
                    .await;
                Ok(())
            }

            CallClientEvent::JoinCall {
                conversation_id,
                room_id,
            } => {
                let user = identity.user_id().ok_or(RealtimeError::AccessDenied)?.clone();

                // Membership first (this is the authorization point), then
                // the session find-or-create.
                let room = RoomId::Call(conversation_id);
                self.rooms.join(conn, room.clone()).await?;
                let join = self.lifecycle.join(conversation_id, room_id).await?;

                self.rooms
                    .broadcast_excluding(
                        &room,
                        conn,
                        CallServerEvent::UserJoinedCall { user_id: user },
                    )
                    .await;
                self.rooms
                    .send_to_connection(
                        conn,
                        CallServerEvent::CallJoined {
                            room_id: join.session.room_id.clone(),
                            conversation_id,
                            session_id: join.session.id,
                        },
                    )
                    .await;
                Ok(())
            }

            CallClientEvent::Offer {
                target_user_id,
                payload,
            } => {
                self.relay_signal(identity, SignalKind::Offer, target_user_id, payload)
                    .await
            }

            CallClientEvent::Answer {
                target_user_id,
                payload,
            } => {
                self.relay_signal(identity, SignalKind::Answer, target_user_id, payload)
                    .await
            }

            CallClientEvent::IceCandidate {
                target_user_id,
                payload,
            } => {
                self.relay_signal(identity, SignalKind::IceCandidate, target_user_id, payload)
                    .await
            }

            CallClientEvent::MuteAudio(muted) => {
                self.broadcast_in_call(conn, identity, |user_id| {
                    CallServerEvent::UserMutedAudio { user_id, muted }
                })
                .await
            }

            CallClientEvent::MuteVideo(muted) => {
                self.broadcast_in_call(conn, identity, |user_id| {
                    CallServerEvent::UserMutedVideo { user_id, muted }
                })
                .await
            }

            CallClientEvent::ScreenShare(sharing) => {
                self.broadcast_in_call(conn, identity, |user_id| {
                    CallServerEvent::UserScreenShare { user_id, sharing }
                })
                .await
            }

            CallClientEvent::StartRecording => {
                self.broadcast_in_call(conn, identity, |user_id| {
                    CallServerEvent::RecordingStarted { user_id }
                })
                .await
            }

            CallClientEvent::StopRecording => {
                self.broadcast_in_call(conn, identity, |user_id| {
                    CallServerEvent::RecordingStopped { user_id }
                })
                .await
            }

            CallClientEvent::EndCall => {
                let user = identity.user_id().ok_or(RealtimeError::AccessDenied)?.clone();
                let RoomId::Call(conversation_id) = self.call_room_of(conn).await? else {
                    return Err(RealtimeError::NotFound("Call room"));
                };
                let ended = self.lifecycle.end(conversation_id, &user).await?;
                self.rooms
                    .send_to_connection(
                        conn,
                        CallServerEvent::CallEndedConfirmation {
                            session_id: ended.id,
                        },
                    )
                    .await;
                Ok(())
            }

            CallClientEvent::CallTimeout => {
                let RoomId::Call(conversation_id) = self.call_room_of(conn).await? else {
                    return Err(RealtimeError::NotFound("Call room"));
                };
                self.lifecycle.timeout(conversation_id).await?;
                Ok(())
            }

            CallClientEvent::ConnectionQuality(value) => {
                self.broadcast_in_call(conn, identity, |user_id| {
                    CallServerEvent::UserConnectionQuality { user_id, value }
                })
                .await
            }
        }
    }

    /// Tell every call room the connection was in that its peer dropped.
    /// The Room Manager already emitted `RoomBecameEmpty` where relevant.
    async fn on_disconnect(&self, _conn: ConnectionId, removed: &RemovedConnection) {
        let Some(user) = removed.identity.user_id() else {
            return;
        };
        for room in &removed.rooms {
            if room.is_call() {
                self.rooms
                    .broadcast(
                        room,
                        CallServerEvent::UserDisconnected {
                            user_id: user.clone(),
                        },
                    )
                    .await;
            }
        }
    }
}
