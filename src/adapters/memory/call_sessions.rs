//! In-memory call session repository.
//!
//! A single mutex stands in for the database's uniqueness constraint: every
//! operation runs under it, so find-or-create and the compare-and-set
//! transitions are atomic within the process, matching the contract the
//! Postgres adapter gets from its partial unique index.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{CallSessionId, ConversationId, Timestamp};
use crate::domain::{CallSession, CallSessionState};
use crate::ports::{ActiveSession, CallSessionRepository, CallSessionRepositoryError};

/// Mutex-guarded session table for tests and local development.
#[derive(Default)]
pub struct InMemoryCallSessions {
    sessions: Mutex<HashMap<CallSessionId, CallSession>>,
}

impl InMemoryCallSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one session, regardless of state.
    pub fn get(&self, id: CallSessionId) -> Option<CallSession> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(&id).cloned()
    }
}

#[async_trait]
impl CallSessionRepository for InMemoryCallSessions {
    async fn find_or_create_active(
        &self,
        conversation_id: ConversationId,
        room_id: &str,
    ) -> Result<ActiveSession, CallSessionRepositoryError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = sessions
            .values()
            .find(|s| s.conversation_id == conversation_id && !s.state.is_terminal())
        {
            return Ok(ActiveSession {
                session: existing.clone(),
                created: false,
            });
        }

        let session = CallSession::pending(conversation_id, room_id);
        sessions.insert(session.id, session.clone());
        Ok(ActiveSession {
            session,
            created: true,
        })
    }

    async fn find_active(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(sessions
            .values()
            .find(|s| s.conversation_id == conversation_id && !s.state.is_terminal())
            .cloned())
    }

    async fn find_latest(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(sessions
            .values()
            .filter(|s| s.conversation_id == conversation_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn try_start(
        &self,
        id: CallSessionId,
        at: Timestamp,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let Some(session) = sessions.get_mut(&id) else {
            return Ok(None);
        };
        if session.state != CallSessionState::Pending {
            return Ok(None);
        }
        let mut updated = session.clone();
        if updated.start(at).is_err() {
            return Ok(None);
        }
        *session = updated.clone();
        Ok(Some(updated))
    }

    async fn try_end(
        &self,
        id: CallSessionId,
        at: Timestamp,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let Some(session) = sessions.get_mut(&id) else {
            return Ok(None);
        };
        let mut updated = session.clone();
        if updated.end(at).is_err() {
            return Ok(None);
        }
        *session = updated.clone();
        Ok(Some(updated))
    }

    async fn try_cancel(
        &self,
        id: CallSessionId,
    ) -> Result<Option<CallSession>, CallSessionRepositoryError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let Some(session) = sessions.get_mut(&id) else {
            return Ok(None);
        };
        let mut updated = session.clone();
        if updated.cancel().is_err() {
            return Ok(None);
        }
        *session = updated.clone();
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn find_or_create_reuses_the_active_session() {
        let repo = InMemoryCallSessions::new();
        let conversation = ConversationId::new();
        let room = CallSession::default_room_id(&conversation);

        let first = repo.find_or_create_active(conversation, &room).await.unwrap();
        assert!(first.created);
        assert_eq!(first.session.state, CallSessionState::Pending);

        let second = repo.find_or_create_active(conversation, &room).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.session.id, first.session.id);
    }

    #[tokio::test]
    async fn terminal_session_does_not_block_a_new_call() {
        let repo = InMemoryCallSessions::new();
        let conversation = ConversationId::new();
        let room = CallSession::default_room_id(&conversation);

        let first = repo.find_or_create_active(conversation, &room).await.unwrap();
        repo.try_start(first.session.id, Timestamp::now())
            .await
            .unwrap();
        repo.try_end(first.session.id, Timestamp::now())
            .await
            .unwrap();

        let next = repo.find_or_create_active(conversation, &room).await.unwrap();
        assert!(next.created);
        assert_ne!(next.session.id, first.session.id);
    }

    #[tokio::test]
    async fn try_start_wins_only_from_pending() {
        let repo = InMemoryCallSessions::new();
        let conversation = ConversationId::new();
        let created = repo
            .find_or_create_active(conversation, "call:x")
            .await
            .unwrap();

        let started = repo
            .try_start(created.session.id, Timestamp::now())
            .await
            .unwrap();
        assert!(started.is_some());

        // Second start loses the compare-and-set.
        let again = repo
            .try_start(created.session.id, Timestamp::now())
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn try_end_on_terminal_session_reports_lost_race() {
        let repo = InMemoryCallSessions::new();
        let conversation = ConversationId::new();
        let created = repo
            .find_or_create_active(conversation, "call:x")
            .await
            .unwrap();
        repo.try_start(created.session.id, Timestamp::now())
            .await
            .unwrap();
        repo.try_end(created.session.id, Timestamp::now())
            .await
            .unwrap();

        let second_end = repo
            .try_end(created.session.id, Timestamp::now())
            .await
            .unwrap();
        assert!(second_end.is_none());
    }

    #[tokio::test]
    async fn try_cancel_works_from_any_non_terminal_state() {
        let repo = InMemoryCallSessions::new();
        let conversation = ConversationId::new();
        let created = repo
            .find_or_create_active(conversation, "call:x")
            .await
            .unwrap();

        let cancelled = repo.try_cancel(created.session.id).await.unwrap();
        assert_eq!(
            cancelled.map(|s| s.state),
            Some(CallSessionState::Cancelled)
        );
        assert!(repo.try_cancel(created.session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_converge_on_one_session() {
        let repo = Arc::new(InMemoryCallSessions::new());
        let conversation = ConversationId::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.find_or_create_active(conversation, "call:x")
                    .await
                    .unwrap()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        let mut creations = 0;
        for handle in handles {
            let active = handle.await.unwrap();
            ids.insert(active.session.id);
            if active.created {
                creations += 1;
            }
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(creations, 1);
    }
}
