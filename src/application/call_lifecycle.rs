//! Call lifecycle coordinator.
//!
//! Per-conversation state machine for call sessions:
//!
//! ```text
//! Pending ──> InProgress ──> Completed
//!    │             │
//!    └─────────────┴───────> Cancelled
//! ```
//!
//! All decisions go through `CallSessionRepository`, whose operations are
//! atomic at the storage layer, so concurrent joins from different
//! connections (or server processes) converge on one session:
//!
//! - a join with no active session creates one in `Pending`
//! - a join that finds an existing `Pending` session starts it
//! - later joins change nothing
//!
//! The coordinator is also the sole consumer of the Room Manager's
//! `RoomBecameEmpty` feed: an emptied call room completes an `InProgress`
//! session, while a `Pending` one is deliberately left alone (the caller
//! may still be waiting for the other side to pick up).

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::adapters::websocket::{CallServerEvent, RoomId, RoomManager};
use crate::domain::foundation::{ConversationId, RealtimeError, Timestamp, UserId};
use crate::domain::{CallSession, CallSessionState};
use crate::ports::CallSessionRepository;

/// Outcome of a join-call request.
#[derive(Debug, Clone)]
pub struct CallJoin {
    pub session: CallSession,

    /// True when this join created the session (first caller in).
    pub created: bool,
}

pub struct CallLifecycleCoordinator {
    rooms: Arc<RoomManager<CallServerEvent>>,
    sessions: Arc<dyn CallSessionRepository>,
}

impl CallLifecycleCoordinator {
    pub fn new(
        rooms: Arc<RoomManager<CallServerEvent>>,
        sessions: Arc<dyn CallSessionRepository>,
    ) -> Self {
        Self { rooms, sessions }
    }

    /// Find or create the conversation's session for a joining participant.
    ///
    /// The creating join leaves the session `Pending`; a join that finds an
    /// existing `Pending` session moves it to `InProgress` and records the
    /// start time. Joins after that are state no-ops.
    pub async fn join(
        &self,
        conversation_id: ConversationId,
        requested_room: Option<String>,
    ) -> Result<CallJoin, RealtimeError> {
        let room_id = requested_room
            .unwrap_or_else(|| CallSession::default_room_id(&conversation_id));

        let active = self
            .sessions
            .find_or_create_active(conversation_id, &room_id)
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?;

        if active.created {
            info!(
                session_id = %active.session.id,
                conversation = %conversation_id,
                "call session created"
            );
            return Ok(CallJoin {
                session: active.session,
                created: true,
            });
        }

        let session = if active.session.state == CallSessionState::Pending {
            match self
                .sessions
                .try_start(active.session.id, Timestamp::now())
                .await
                .map_err(|e| RealtimeError::internal(e.to_string()))?
            {
                Some(started) => {
                    info!(session_id = %started.id, "call session started");
                    started
                }
                // Lost the start race; the winner set started_at.
                None => self
                    .sessions
                    .find_active(conversation_id)
                    .await
                    .map_err(|e| RealtimeError::internal(e.to_string()))?
                    .unwrap_or(active.session),
            }
        } else {
            active.session
        };

        Ok(CallJoin {
            session,
            created: false,
        })
    }

    /// Explicit end from either participant: `InProgress -> Completed`.
    ///
    /// Broadcasts `call-ended` to the call room. Ending a terminal (or
    /// never-started) session reports `StateConflict` to the caller only.
    pub async fn end(
        &self,
        conversation_id: ConversationId,
        ended_by: &UserId,
    ) -> Result<CallSession, RealtimeError> {
        let session = self
            .sessions
            .find_latest(conversation_id)
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?
            .ok_or(RealtimeError::NotFound("Call session"))?;

        if session.state.is_terminal() {
            return Err(RealtimeError::StateConflict(session.state.as_str()));
        }

        match self
            .sessions
            .try_end(session.id, Timestamp::now())
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?
        {
            Some(ended) => {
                info!(session_id = %ended.id, ended_by = %ended_by, "call session completed");
                self.rooms
                    .broadcast(
                        &RoomId::Call(conversation_id),
                        CallServerEvent::CallEnded {
                            ended_by: ended_by.clone(),
                        },
                    )
                    .await;
                Ok(ended)
            }
            None => {
                // Lost the race; report whatever state won.
                let state = self
                    .sessions
                    .find_latest(conversation_id)
                    .await
                    .map_err(|e| RealtimeError::internal(e.to_string()))?
                    .map(|s| s.state)
                    .unwrap_or(session.state);
                Err(RealtimeError::StateConflict(state.as_str()))
            }
        }
    }

    /// Client-reported negotiation timeout: any non-terminal -> Cancelled.
    ///
    /// Returns `None` when no session was live to cancel; a late timeout
    /// report after the call closed is not an error.
    pub async fn timeout(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<CallSession>, RealtimeError> {
        let Some(session) = self
            .sessions
            .find_active(conversation_id)
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?
        else {
            return Ok(None);
        };

        let cancelled = self
            .sessions
            .try_cancel(session.id)
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?;

        if let Some(cancelled) = &cancelled {
            warn!(session_id = %cancelled.id, "call session cancelled after client timeout");
            self.rooms
                .broadcast(&RoomId::Call(conversation_id), CallServerEvent::CallTimeout)
                .await;
        }
        Ok(cancelled)
    }

    /// Auto-close path, fed exclusively by the Room Manager's emptiness
    /// signal. An `InProgress` session whose room emptied is completed; a
    /// `Pending` one stays `Pending`.
    pub async fn handle_room_empty(&self, room: RoomId) -> Result<(), RealtimeError> {
        let RoomId::Call(conversation_id) = room else {
            return Ok(());
        };

        let Some(session) = self
            .sessions
            .find_active(conversation_id)
            .await
            .map_err(|e| RealtimeError::internal(e.to_string()))?
        else {
            return Ok(());
        };

        match session.state {
            CallSessionState::InProgress => {
                if let Some(ended) = self
                    .sessions
                    .try_end(session.id, Timestamp::now())
                    .await
                    .map_err(|e| RealtimeError::internal(e.to_string()))?
                {
                    info!(session_id = %ended.id, "call session auto-closed on empty room");
                }
            }
            // A pending call with nobody in the room is still dialable.
            other => {
                debug!(session_id = %session.id, state = %other, "empty room, session left as-is");
            }
        }
        Ok(())
    }

    /// Drain the emptiness feed until the Room Manager shuts down.
    ///
    /// Spawned once at startup; store failures are logged and the loop
    /// keeps serving later signals.
    pub async fn run(self: Arc<Self>, mut empty_rooms: mpsc::UnboundedReceiver<RoomId>) {
        while let Some(room) = empty_rooms.recv().await {
            if let Err(err) = self.handle_room_empty(room).await {
                error!(error = ?err, "auto-close failed");
            }
        }
    }
}
