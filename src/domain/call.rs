//! Call session aggregate and its lifecycle state machine.
//!
//! One call session tracks one signaling attempt for a conversation:
//!
//! ```text
//! Pending ──> InProgress ──> Completed
//!    │             │
//!    └─────────────┴───────> Cancelled
//! ```
//!
//! `Completed` and `Cancelled` are terminal. The storage layer enforces the
//! companion invariant that a conversation has at most one non-terminal
//! session at any time.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::foundation::{CallSessionId, ConversationId, RealtimeError, Timestamp};

/// Lifecycle state of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallSessionState {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl CallSessionState {
    /// Returns true for states with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallSessionState::Completed | CallSessionState::Cancelled)
    }

    /// Validates a transition from this state to another.
    ///
    /// Valid transitions:
    /// - Pending -> InProgress
    /// - Pending -> Cancelled
    /// - InProgress -> Completed
    /// - InProgress -> Cancelled
    pub fn can_transition_to(&self, target: &CallSessionState) -> bool {
        use CallSessionState::*;
        matches!(
            (self, target),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    /// Stable lowercase name, used in conflict messages and storage rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallSessionState::Pending => "pending",
            CallSessionState::InProgress => "in_progress",
            CallSessionState::Completed => "completed",
            CallSessionState::Cancelled => "cancelled",
        }
    }

    /// Parses the storage rendering produced by `as_str`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CallSessionState::Pending),
            "in_progress" => Some(CallSessionState::InProgress),
            "completed" => Some(CallSessionState::Completed),
            "cancelled" => Some(CallSessionState::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for CallSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The stateful record of one signaling attempt for a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub id: CallSessionId,
    pub conversation_id: ConversationId,

    /// Wire-level room label the participants rendezvous in.
    pub room_id: String,

    pub state: CallSessionState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,

    pub created_at: Timestamp,
}

impl CallSession {
    /// Creates a fresh pending session for a conversation.
    pub fn pending(conversation_id: ConversationId, room_id: impl Into<String>) -> Self {
        Self {
            id: CallSessionId::new(),
            conversation_id,
            room_id: room_id.into(),
            state: CallSessionState::Pending,
            started_at: None,
            ended_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Default room label for a conversation's call.
    pub fn default_room_id(conversation_id: &ConversationId) -> String {
        format!("call:{}", conversation_id)
    }

    /// Pending -> InProgress, recording the start time.
    pub fn start(&mut self, at: Timestamp) -> Result<(), RealtimeError> {
        self.transition(CallSessionState::InProgress)?;
        self.started_at = Some(at);
        Ok(())
    }

    /// InProgress -> Completed, recording the end time.
    pub fn end(&mut self, at: Timestamp) -> Result<(), RealtimeError> {
        self.transition(CallSessionState::Completed)?;
        self.ended_at = Some(at);
        Ok(())
    }

    /// Any non-terminal state -> Cancelled.
    pub fn cancel(&mut self) -> Result<(), RealtimeError> {
        self.transition(CallSessionState::Cancelled)
    }

    fn transition(&mut self, target: CallSessionState) -> Result<(), RealtimeError> {
        if !self.state.can_transition_to(&target) {
            return Err(RealtimeError::StateConflict(self.state.as_str()));
        }
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session() -> CallSession {
        let conversation = ConversationId::new();
        let room = CallSession::default_room_id(&conversation);
        CallSession::pending(conversation, room)
    }

    #[test]
    fn new_session_is_pending_without_times() {
        let s = session();
        assert_eq!(s.state, CallSessionState::Pending);
        assert!(s.started_at.is_none());
        assert!(s.ended_at.is_none());
    }

    #[test]
    fn start_records_time_and_moves_to_in_progress() {
        let mut s = session();
        let at = Timestamp::now();
        s.start(at).unwrap();

        assert_eq!(s.state, CallSessionState::InProgress);
        assert_eq!(s.started_at, Some(at));
    }

    #[test]
    fn end_records_time_and_completes() {
        let mut s = session();
        s.start(Timestamp::now()).unwrap();
        let at = Timestamp::now();
        s.end(at).unwrap();

        assert_eq!(s.state, CallSessionState::Completed);
        assert_eq!(s.ended_at, Some(at));
    }

    #[test]
    fn end_before_start_is_a_state_conflict() {
        let mut s = session();
        let err = s.end(Timestamp::now()).unwrap_err();
        assert_eq!(err, RealtimeError::StateConflict("pending"));
    }

    #[test]
    fn end_on_completed_session_is_a_state_conflict_not_a_panic() {
        let mut s = session();
        s.start(Timestamp::now()).unwrap();
        s.end(Timestamp::now()).unwrap();

        let err = s.end(Timestamp::now()).unwrap_err();
        assert_eq!(err, RealtimeError::StateConflict("completed"));
    }

    #[test]
    fn cancel_works_from_pending_and_in_progress_only() {
        let mut pending = session();
        assert!(pending.cancel().is_ok());

        let mut live = session();
        live.start(Timestamp::now()).unwrap();
        assert!(live.cancel().is_ok());

        let mut done = session();
        done.start(Timestamp::now()).unwrap();
        done.end(Timestamp::now()).unwrap();
        assert_eq!(
            done.cancel().unwrap_err(),
            RealtimeError::StateConflict("completed")
        );
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(!CallSessionState::Pending.is_terminal());
        assert!(!CallSessionState::InProgress.is_terminal());
        assert!(CallSessionState::Completed.is_terminal());
        assert!(CallSessionState::Cancelled.is_terminal());
    }

    #[test]
    fn state_round_trips_through_storage_rendering() {
        for state in [
            CallSessionState::Pending,
            CallSessionState::InProgress,
            CallSessionState::Completed,
            CallSessionState::Cancelled,
        ] {
            assert_eq!(CallSessionState::parse(state.as_str()), Some(state));
        }
        assert_eq!(CallSessionState::parse("exploded"), None);
    }

    #[test]
    fn default_room_id_embeds_conversation() {
        let conversation = ConversationId::new();
        let room = CallSession::default_room_id(&conversation);
        assert_eq!(room, format!("call:{}", conversation));
    }

    fn any_state() -> impl Strategy<Value = CallSessionState> {
        prop_oneof![
            Just(CallSessionState::Pending),
            Just(CallSessionState::InProgress),
            Just(CallSessionState::Completed),
            Just(CallSessionState::Cancelled),
        ]
    }

    proptest! {
        /// No transition ever leaves a terminal state, and every accepted
        /// transition lands on a legal edge of the lifecycle graph.
        #[test]
        fn transitions_follow_legal_edges_only(from in any_state(), to in any_state()) {
            let allowed = from.can_transition_to(&to);

            if from.is_terminal() {
                prop_assert!(!allowed);
            }
            if allowed {
                use CallSessionState::*;
                prop_assert!(matches!(
                    (from, to),
                    (Pending, InProgress)
                        | (Pending, Cancelled)
                        | (InProgress, Completed)
                        | (InProgress, Cancelled)
                ));
            }
        }
    }
}
