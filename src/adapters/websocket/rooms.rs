//! Room membership and fan-out for one channel space.
//!
//! Rooms group connections so events can be addressed to a user (personal
//! room), to a conversation, or to a call:
//!
//! ```text
//! Room: personal:doctor-1   Room: conversation:42    Room: call:42
//! └── conn-a                ├── conn-a               ├── conn-a
//!                           └── conn-b               └── conn-b
//! ```
//!
//! One `RoomManager` instance exists per channel space (chat,
//! notifications, call signaling) and is the *only* owner of membership
//! state; every other component reads or mutates membership through its
//! API. Join is the authorization point: personal rooms admit only their
//! own identity, conversation and call rooms admit only the participants
//! resolved from the record store.
//!
//! # Thread Safety
//!
//! All state lives behind one `RwLock`, so each operation is atomic with
//! respect to the others. Delivery goes through per-connection unbounded
//! senders, preserving per-recipient ordering per room.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::foundation::{ConversationId, Identity, RealtimeError, UserId};
use crate::ports::ConversationStore;

/// Unique identifier for one persistent connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed room address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomId {
    /// One user's private room; every connection of that user is in it.
    Personal(UserId),

    /// Chat scope of one conversation.
    Conversation(ConversationId),

    /// Signaling scope of one conversation's call.
    Call(ConversationId),
}

impl RoomId {
    /// Returns true for call rooms, which feed the lifecycle coordinator
    /// when they empty out.
    pub fn is_call(&self) -> bool {
        matches!(self, RoomId::Call(_))
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Personal(user) => write!(f, "personal:{}", user),
            RoomId::Conversation(conv) => write!(f, "conversation:{}", conv),
            RoomId::Call(conv) => write!(f, "call:{}", conv),
        }
    }
}

/// What a disconnecting connection leaves behind.
#[derive(Debug)]
pub struct RemovedConnection {
    pub identity: Identity,

    /// Rooms the connection was a member of at disconnect time.
    pub rooms: Vec<RoomId>,
}

struct ConnectionEntry<E> {
    identity: Identity,
    sender: mpsc::UnboundedSender<E>,
    rooms: HashSet<RoomId>,
}

struct Registry<E> {
    connections: HashMap<ConnectionId, ConnectionEntry<E>>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl<E> Registry<E> {
    fn new() -> Self {
        Self {
            connections: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    /// Removes one membership edge; reports whether the room is now gone.
    fn remove_member(&mut self, room: &RoomId, conn: ConnectionId) -> bool {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(room);
                return true;
            }
        }
        false
    }
}

/// Membership tables and event fan-out for one channel space.
pub struct RoomManager<E> {
    registry: RwLock<Registry<E>>,
    store: Arc<dyn ConversationStore>,

    /// Emits `RoomBecameEmpty` for call rooms. Consumed only by the call
    /// lifecycle coordinator; `None` on channel spaces without calls.
    empty_tx: Option<mpsc::UnboundedSender<RoomId>>,
}

impl<E: Clone + Send + 'static> RoomManager<E> {
    /// Create a room manager without an emptiness signal (chat,
    /// notifications).
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            store,
            empty_tx: None,
        }
    }

    /// Create a room manager that reports emptied call rooms.
    ///
    /// The receiver is handed to the call lifecycle coordinator.
    pub fn with_empty_signal(
        store: Arc<dyn ConversationStore>,
    ) -> (Self, mpsc::UnboundedReceiver<RoomId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            registry: RwLock::new(Registry::new()),
            store,
            empty_tx: Some(tx),
        };
        (manager, rx)
    }

    /// Register a freshly-authenticated connection and its outbound sender.
    pub async fn register(
        &self,
        conn: ConnectionId,
        identity: Identity,
        sender: mpsc::UnboundedSender<E>,
    ) {
        let mut registry = self.registry.write().await;
        registry.connections.insert(
            conn,
            ConnectionEntry {
                identity,
                sender,
                rooms: HashSet::new(),
            },
        );
    }

    /// Remove a connection and all of its memberships.
    ///
    /// Dropping the entry drops the outbound sender, releasing every
    /// binding registered for the connection. Returns `None` for unknown
    /// connections (already cleaned up).
    pub async fn remove_connection(&self, conn: ConnectionId) -> Option<RemovedConnection> {
        let mut registry = self.registry.write().await;
        let entry = registry.connections.remove(&conn)?;

        let rooms: Vec<RoomId> = entry.rooms.iter().cloned().collect();
        for room in &rooms {
            if registry.remove_member(room, conn) {
                self.signal_empty(room);
            }
        }

        Some(RemovedConnection {
            identity: entry.identity,
            rooms,
        })
    }

    /// Join a connection to a room, enforcing the room-kind authorization
    /// rules. Re-joining an already-joined room is a no-op success.
    pub async fn join(&self, conn: ConnectionId, room: RoomId) -> Result<(), RealtimeError> {
        // Authorization reads the store without holding the lock; the
        // membership write below re-checks the connection still exists.
        let identity = self
            .identity_of(conn)
            .await
            .ok_or(RealtimeError::AccessDenied)?;
        self.authorize(&identity, &room).await?;

        let mut registry = self.registry.write().await;
        let Some(entry) = registry.connections.get_mut(&conn) else {
            // Disconnected while the store lookup was in flight.
            return Err(RealtimeError::AccessDenied);
        };
        if entry.rooms.insert(room.clone()) {
            registry.rooms.entry(room).or_default().insert(conn);
        }
        Ok(())
    }

    /// Leave one room explicitly.
    pub async fn leave(&self, conn: ConnectionId, room: &RoomId) {
        let mut registry = self.registry.write().await;
        if let Some(entry) = registry.connections.get_mut(&conn) {
            if entry.rooms.remove(room) && registry.remove_member(room, conn) {
                self.signal_empty(room);
            }
        }
    }

    /// Send an event to every member of a room.
    ///
    /// An empty or unknown room is a silent no-op.
    pub async fn broadcast(&self, room: &RoomId, event: E) {
        self.broadcast_except(room, None, event).await;
    }

    /// Send an event to every member of a room except one connection
    /// (typically the originator).
    pub async fn broadcast_excluding(&self, room: &RoomId, except: ConnectionId, event: E) {
        self.broadcast_except(room, Some(except), event).await;
    }

    /// Send an event to every connection in a user's personal room.
    pub async fn send_to_user(&self, user: &UserId, event: E) {
        self.broadcast(&RoomId::Personal(user.clone()), event).await;
    }

    /// Send an event to one connection.
    pub async fn send_to_connection(&self, conn: ConnectionId, event: E) {
        let registry = self.registry.read().await;
        if let Some(entry) = registry.connections.get(&conn) {
            let _ = entry.sender.send(event);
        }
    }

    /// Identity a connection authenticated as.
    pub async fn identity_of(&self, conn: ConnectionId) -> Option<Identity> {
        let registry = self.registry.read().await;
        registry.connections.get(&conn).map(|e| e.identity.clone())
    }

    /// Rooms a connection currently belongs to.
    pub async fn rooms_of(&self, conn: ConnectionId) -> Vec<RoomId> {
        let registry = self.registry.read().await;
        registry
            .connections
            .get(&conn)
            .map(|e| e.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of connections currently in a room (0 if it doesn't exist).
    pub async fn member_count(&self, room: &RoomId) -> usize {
        let registry = self.registry.read().await;
        registry.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    async fn authorize(&self, identity: &Identity, room: &RoomId) -> Result<(), RealtimeError> {
        match room {
            RoomId::Personal(user) => {
                if identity.is_user(user) {
                    Ok(())
                } else {
                    Err(RealtimeError::AccessDenied)
                }
            }
            RoomId::Conversation(conv) | RoomId::Call(conv) => {
                let Some(user) = identity.user_id() else {
                    return Err(RealtimeError::AccessDenied);
                };
                let conversation = self
                    .store
                    .find_conversation(*conv)
                    .await
                    .map_err(|e| RealtimeError::internal(e.to_string()))?
                    .ok_or(RealtimeError::NotFound("Conversation"))?;
                if conversation.is_participant(user) {
                    Ok(())
                } else {
                    Err(RealtimeError::AccessDenied)
                }
            }
        }
    }

    async fn broadcast_except(&self, room: &RoomId, except: Option<ConnectionId>, event: E) {
        let registry = self.registry.read().await;
        let Some(members) = registry.rooms.get(room) else {
            return;
        };
        for conn in members {
            if Some(*conn) == except {
                continue;
            }
            if let Some(entry) = registry.connections.get(conn) {
                // A closed receiver just means the connection is mid-teardown.
                let _ = entry.sender.send(event.clone());
            }
        }
    }

    fn signal_empty(&self, room: &RoomId) {
        if !room.is_call() {
            return;
        }
        if let Some(tx) = &self.empty_tx {
            let _ = tx.send(room.clone());
        }
    }
}
