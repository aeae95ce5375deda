//! End-to-end scenarios for the real-time core.
//!
//! These tests drive the three channel structs directly (the socket loop is
//! a thin framing layer over them) with in-memory adapters:
//! 1. Chat round trip between the two participants of a conversation
//! 2. Call establishment, start-on-second-join and signaling relay
//! 3. Auto-close when every call participant disconnects
//! 4. Access denial for a non-participant

use std::sync::Arc;

use tokio::sync::mpsc;

use carelink_rtc::adapters::memory::{InMemoryCallSessions, InMemoryRecordStore};
use carelink_rtc::adapters::websocket::{
    CallChannel, CallClientEvent, CallServerEvent, Channel, ChatChannel, ChatClientEvent,
    ChatServerEvent, ConnectionId, RoomId, RoomManager,
};
use carelink_rtc::application::{CallLifecycleCoordinator, MessageRelay};
use carelink_rtc::domain::foundation::{
    ConversationId, Identity, RealtimeError, UserId, UserRole,
};
use carelink_rtc::domain::{CallSessionState, Conversation, MessageKind};
use carelink_rtc::ports::{CallSessionRepository, ConversationStore};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    conversation: Conversation,
    sessions: Arc<InMemoryCallSessions>,
    chat: ChatChannel,
    call: CallChannel,
    lifecycle: Arc<CallLifecycleCoordinator>,
    empty_rooms: mpsc::UnboundedReceiver<RoomId>,
}

impl Harness {
    fn new() -> Self {
        let conversation = Conversation::new(
            ConversationId::new(),
            UserId::new("doctor-a"),
            UserId::new("patient-b"),
        );
        let store = Arc::new(InMemoryRecordStore::new());
        store.insert_conversation(conversation.clone());
        let store: Arc<dyn ConversationStore> = store;

        let chat_rooms = Arc::new(RoomManager::new(Arc::clone(&store)));
        let relay = Arc::new(MessageRelay::new(Arc::clone(&chat_rooms), Arc::clone(&store)));
        let chat = ChatChannel::new(chat_rooms, relay);

        let (call_rooms, empty_rooms) = RoomManager::with_empty_signal(Arc::clone(&store));
        let call_rooms = Arc::new(call_rooms);
        let sessions = Arc::new(InMemoryCallSessions::new());
        let lifecycle = Arc::new(CallLifecycleCoordinator::new(
            Arc::clone(&call_rooms),
            Arc::clone(&sessions) as Arc<dyn CallSessionRepository>,
        ));
        let call = CallChannel::new(call_rooms, Arc::clone(&lifecycle));

        Self {
            conversation,
            sessions,
            chat,
            call,
            lifecycle,
            empty_rooms,
        }
    }

    /// Feed buffered emptiness signals to the coordinator, as the spawned
    /// consumer task does in the binary.
    async fn drain_empty_rooms(&mut self) {
        while let Ok(room) = self.empty_rooms.try_recv() {
            self.lifecycle.handle_room_empty(room).await.unwrap();
        }
    }
}

struct Client<E> {
    conn: ConnectionId,
    identity: Identity,
    rx: mpsc::UnboundedReceiver<E>,
}

impl<E> Client<E> {
    fn recv(&mut self) -> E {
        self.rx.try_recv().expect("expected a buffered event")
    }

    fn silent(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }
}

async fn connect<C: Channel>(channel: &C, user: &str, role: UserRole) -> Client<C::ServerEvent> {
    let conn = ConnectionId::new();
    let identity = Identity::authenticated(UserId::new(user), role);
    let (tx, rx) = mpsc::unbounded_channel();
    channel.rooms().register(conn, identity.clone(), tx).await;
    Client { conn, identity, rx }
}

async fn send<C: Channel>(
    channel: &C,
    client: &Client<C::ServerEvent>,
    event: C::ClientEvent,
) -> Result<(), RealtimeError> {
    channel.handle(client.conn, &client.identity, event).await
}

// =============================================================================
// Scenario 1: chat round trip
// =============================================================================

#[tokio::test]
async fn chat_round_trip_between_participants() {
    let harness = Harness::new();
    let conv = harness.conversation.id;

    let mut doctor = connect(&harness.chat, "doctor-a", UserRole::Doctor).await;
    let mut patient = connect(&harness.chat, "patient-b", UserRole::Patient).await;

    for (client, user) in [(&doctor, "doctor-a"), (&patient, "patient-b")] {
        send(
            &harness.chat,
            client,
            ChatClientEvent::JoinUser {
                user_id: UserId::new(user),
            },
        )
        .await
        .unwrap();
        send(
            &harness.chat,
            client,
            ChatClientEvent::JoinAppointment {
                conversation_id: conv,
            },
        )
        .await
        .unwrap();
    }
    assert!(matches!(doctor.recv(), ChatServerEvent::Joined { .. }));
    assert!(matches!(
        doctor.recv(),
        ChatServerEvent::AppointmentJoined { .. }
    ));
    assert!(matches!(patient.recv(), ChatServerEvent::Joined { .. }));
    assert!(matches!(
        patient.recv(),
        ChatServerEvent::AppointmentJoined { .. }
    ));

    send(
        &harness.chat,
        &doctor,
        ChatClientEvent::SendMessage {
            receiver_id: UserId::new("patient-b"),
            conversation_id: Some(conv),
            content: "hi".to_string(),
            kind: MessageKind::Text,
            file_id: None,
        },
    )
    .await
    .unwrap();

    // Patient sees the personal-room copy and the conversation copy.
    let ChatServerEvent::NewMessage(message) = patient.recv() else {
        panic!("expected new-message first");
    };
    assert_eq!(message.sender_id, UserId::new("doctor-a"));
    assert_eq!(message.content, "hi");
    assert!(matches!(
        patient.recv(),
        ChatServerEvent::AppointmentMessage(_)
    ));
    assert!(patient.silent());

    // Doctor gets the conversation copy and the delivery ack.
    assert!(matches!(
        doctor.recv(),
        ChatServerEvent::AppointmentMessage(_)
    ));
    let ChatServerEvent::MessageSent(ack) = doctor.recv() else {
        panic!("expected message-sent ack");
    };
    assert_eq!(ack.id, message.id);
    assert!(doctor.silent());
}

// =============================================================================
// Scenario 2: call establishment and signaling
// =============================================================================

#[tokio::test]
async fn call_establishment_start_on_second_join_and_signaling() {
    let harness = Harness::new();
    let conv = harness.conversation.id;

    let mut doctor = connect(&harness.call, "doctor-a", UserRole::Doctor).await;
    let mut patient = connect(&harness.call, "patient-b", UserRole::Patient).await;
    for (client, user) in [(&doctor, "doctor-a"), (&patient, "patient-b")] {
        send(
            &harness.call,
            client,
            CallClientEvent::JoinUser {
                user_id: UserId::new(user),
            },
        )
        .await
        .unwrap();
    }
    assert!(matches!(doctor.recv(), CallServerEvent::Joined));
    assert!(matches!(patient.recv(), CallServerEvent::Joined));

    // First join creates a pending session.
    send(
        &harness.call,
        &doctor,
        CallClientEvent::JoinCall {
            conversation_id: conv,
            room_id: None,
        },
    )
    .await
    .unwrap();
    let CallServerEvent::CallJoined { session_id, .. } = doctor.recv() else {
        panic!("expected call-joined");
    };
    assert_eq!(
        harness.sessions.get(session_id).map(|s| s.state),
        Some(CallSessionState::Pending)
    );

    // Second join starts it and notifies the first participant.
    send(
        &harness.call,
        &patient,
        CallClientEvent::JoinCall {
            conversation_id: conv,
            room_id: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(
        doctor.recv(),
        CallServerEvent::UserJoinedCall {
            user_id: UserId::new("patient-b"),
        }
    );
    assert!(matches!(patient.recv(), CallServerEvent::CallJoined { .. }));

    let session = harness.sessions.get(session_id).unwrap();
    assert_eq!(session.state, CallSessionState::InProgress);
    assert!(session.started_at.is_some());

    // Offer relayed to the target with the sender stamped on.
    let payload = serde_json::json!({ "sdp": "v=0..." });
    send(
        &harness.call,
        &doctor,
        CallClientEvent::Offer {
            target_user_id: UserId::new("patient-b"),
            payload: payload.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        patient.recv(),
        CallServerEvent::Offer {
            from_user_id: UserId::new("doctor-a"),
            payload,
        }
    );
}

// =============================================================================
// Scenario 3: auto-close on dual disconnect
// =============================================================================

#[tokio::test]
async fn call_completes_when_every_participant_disconnects() {
    let mut harness = Harness::new();
    let conv = harness.conversation.id;

    let doctor = connect(&harness.call, "doctor-a", UserRole::Doctor).await;
    let patient = connect(&harness.call, "patient-b", UserRole::Patient).await;
    for client in [&doctor, &patient] {
        send(
            &harness.call,
            client,
            CallClientEvent::JoinCall {
                conversation_id: conv,
                room_id: None,
            },
        )
        .await
        .unwrap();
    }
    let session = harness.sessions.find_active(conv).await.unwrap().unwrap();
    assert_eq!(session.state, CallSessionState::InProgress);

    // First disconnect leaves one member; nothing closes.
    harness.call.rooms().remove_connection(doctor.conn).await;
    harness.drain_empty_rooms().await;
    assert_eq!(
        harness.sessions.get(session.id).map(|s| s.state),
        Some(CallSessionState::InProgress)
    );

    // Last disconnect empties the room and completes the session.
    harness.call.rooms().remove_connection(patient.conn).await;
    harness.drain_empty_rooms().await;

    let closed = harness.sessions.get(session.id).unwrap();
    assert_eq!(closed.state, CallSessionState::Completed);
    assert!(closed.ended_at.is_some());
}

#[tokio::test]
async fn pending_call_survives_its_creator_disconnecting() {
    let mut harness = Harness::new();
    let conv = harness.conversation.id;

    let doctor = connect(&harness.call, "doctor-a", UserRole::Doctor).await;
    send(
        &harness.call,
        &doctor,
        CallClientEvent::JoinCall {
            conversation_id: conv,
            room_id: None,
        },
    )
    .await
    .unwrap();
    let session = harness.sessions.find_active(conv).await.unwrap().unwrap();

    harness.call.rooms().remove_connection(doctor.conn).await;
    harness.drain_empty_rooms().await;

    // Still dialable: the patient may pick up later.
    assert_eq!(
        harness.sessions.get(session.id).map(|s| s.state),
        Some(CallSessionState::Pending)
    );
}

// =============================================================================
// Scenario 4: access denial
// =============================================================================

#[tokio::test]
async fn non_participant_is_denied_and_gets_no_membership() {
    let harness = Harness::new();
    let conv = harness.conversation.id;

    let intruder = connect(&harness.chat, "intruder-c", UserRole::Patient).await;

    let err = send(
        &harness.chat,
        &intruder,
        ChatClientEvent::JoinAppointment {
            conversation_id: conv,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err, RealtimeError::AccessDenied);
    assert_eq!(err.client_message(), "Access denied");
    assert_eq!(
        harness
            .chat
            .rooms()
            .member_count(&RoomId::Conversation(conv))
            .await,
        0
    );
}

#[tokio::test]
async fn anonymous_connection_stays_open_but_cannot_join() {
    let harness = Harness::new();

    let conn = ConnectionId::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    harness
        .chat
        .rooms()
        .register(conn, Identity::Anonymous, tx)
        .await;

    let err = harness
        .chat
        .handle(
            conn,
            &Identity::Anonymous,
            ChatClientEvent::JoinUser {
                user_id: UserId::new("doctor-a"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, RealtimeError::AccessDenied);

    // The connection itself is still registered.
    assert!(harness.chat.rooms().identity_of(conn).await.is_some());
}

// =============================================================================
// Convergence under concurrency
// =============================================================================

#[tokio::test]
async fn concurrent_call_joins_converge_on_one_session() {
    let harness = Harness::new();
    let conv = harness.conversation.id;
    let lifecycle = Arc::clone(&harness.lifecycle);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let lifecycle = Arc::clone(&lifecycle);
        handles.push(tokio::spawn(
            async move { lifecycle.join(conv, None).await.unwrap() },
        ));
    }

    let mut ids = std::collections::HashSet::new();
    let mut creations = 0;
    for handle in handles {
        let join = handle.await.unwrap();
        ids.insert(join.session.id);
        if join.created {
            creations += 1;
        }
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(creations, 1);
    assert!(harness.sessions.find_active(conv).await.unwrap().is_some());
}
