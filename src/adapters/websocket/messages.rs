//! Wire protocol for the three channel spaces.
//!
//! Every frame is JSON of the shape `{"event": "<name>", "data": {...}}`,
//! with kebab-case event names and camelCase payload fields. Each channel
//! space has its own client/server vocabulary; nothing is shared across
//! spaces, so adding an event to one cannot leak into another.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{
    CallSessionId, ConversationId, MessageId, NotificationId, UserId, UserRole,
};
use crate::domain::{ConversationMessage, MessageKind, Notification};

// ============================================================
// Chat channel
// ============================================================

/// Client frames on the chat channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChatClientEvent {
    /// Enter the caller's personal room.
    #[serde(rename_all = "camelCase")]
    JoinUser { user_id: UserId },

    /// Enter a conversation room (appointment scope).
    #[serde(rename_all = "camelCase")]
    JoinAppointment { conversation_id: ConversationId },

    /// Send a message in-band; the core persists it via the record store
    /// and relays the stored row.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        receiver_id: UserId,
        #[serde(default)]
        conversation_id: Option<ConversationId>,
        content: String,
        #[serde(rename = "type", default)]
        kind: MessageKind,
        #[serde(default)]
        file_id: Option<String>,
    },

    /// Acknowledge a message as read; routed back to its sender.
    MarkRead(MessageId),

    /// Typing indicator on.
    #[serde(rename_all = "camelCase")]
    TypingStart {
        receiver_id: UserId,
        #[serde(default)]
        conversation_id: Option<ConversationId>,
    },

    /// Typing indicator off.
    #[serde(rename_all = "camelCase")]
    TypingStop {
        receiver_id: UserId,
        #[serde(default)]
        conversation_id: Option<ConversationId>,
    },
}

/// Server frames on the chat channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChatServerEvent {
    /// Personal room entered.
    #[serde(rename_all = "camelCase")]
    Joined { user_id: UserId, role: UserRole },

    /// Conversation room entered.
    #[serde(rename_all = "camelCase")]
    AppointmentJoined { conversation_id: ConversationId },

    /// A message addressed to the recipient's personal room.
    NewMessage(ConversationMessage),

    /// The same message, scoped to its conversation room.
    AppointmentMessage(ConversationMessage),

    /// Delivery confirmation back to the sender.
    MessageSent(ConversationMessage),

    /// Read receipt routed to the original sender.
    #[serde(rename_all = "camelCase")]
    MessageRead { message_id: MessageId, read_by: UserId },

    /// Peer typing state, personal-room scope.
    #[serde(rename_all = "camelCase")]
    UserTyping { user_id: UserId, is_typing: bool },

    /// Peer typing state, conversation-room scope.
    #[serde(rename_all = "camelCase")]
    AppointmentTyping { user_id: UserId, is_typing: bool },

    /// Handler failure, sent to the originating connection only.
    Error { message: String },
}

// ============================================================
// Notification channel
// ============================================================

/// Client frames on the notification channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum NotificationClientEvent {
    /// Enter the caller's personal room.
    #[serde(rename_all = "camelCase")]
    JoinUser { user_id: UserId },
}

/// Server frames on the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum NotificationServerEvent {
    /// Personal room entered.
    Joined,

    /// A notification pushed by the record-store side.
    NewNotification(Notification),

    /// A notification was read on another device.
    #[serde(rename_all = "camelCase")]
    NotificationRead { notification_id: NotificationId },

    /// Handler failure, sent to the originating connection only.
    Error { message: String },
}

// ============================================================
// Call-signaling channel
// ============================================================

/// Negotiation payload relayed without interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// Client frames on the call-signaling channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum CallClientEvent {
    /// Enter the caller's personal room (signaling address).
    #[serde(rename_all = "camelCase")]
    JoinUser { user_id: UserId },

    /// Join (or create) the conversation's call.
    #[serde(rename_all = "camelCase")]
    JoinCall {
        conversation_id: ConversationId,
        #[serde(default)]
        room_id: Option<String>,
    },

    /// Session description offer for one peer.
    #[serde(rename_all = "camelCase")]
    Offer { target_user_id: UserId, payload: Value },

    /// Session description answer for one peer.
    #[serde(rename_all = "camelCase")]
    Answer { target_user_id: UserId, payload: Value },

    /// Transport candidate for one peer.
    #[serde(rename_all = "camelCase")]
    IceCandidate { target_user_id: UserId, payload: Value },

    /// Audio mute toggle, broadcast to the call room.
    MuteAudio(bool),

    /// Video mute toggle, broadcast to the call room.
    MuteVideo(bool),

    /// Screen share toggle, broadcast to the call room.
    ScreenShare(bool),

    /// Recording started notice (the recording itself happens client-side).
    StartRecording,

    /// Recording stopped notice.
    StopRecording,

    /// End the active call.
    EndCall,

    /// Client-side negotiation timeout; cancels the session.
    CallTimeout,

    /// Link quality report, relayed to the call room.
    ConnectionQuality(Value),
}

/// Server frames on the call-signaling channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum CallServerEvent {
    /// Personal room entered.
    Joined,

    /// Call room entered; carries the session this call runs under.
    #[serde(rename_all = "camelCase")]
    CallJoined {
        room_id: String,
        conversation_id: ConversationId,
        session_id: CallSessionId,
    },

    /// Another participant entered the call room.
    #[serde(rename_all = "camelCase")]
    UserJoinedCall { user_id: UserId },

    /// Relayed offer, stamped with the sending identity.
    #[serde(rename_all = "camelCase")]
    Offer { from_user_id: UserId, payload: Value },

    /// Relayed answer.
    #[serde(rename_all = "camelCase")]
    Answer { from_user_id: UserId, payload: Value },

    /// Relayed candidate.
    #[serde(rename_all = "camelCase")]
    IceCandidate { from_user_id: UserId, payload: Value },

    /// Peer audio mute state.
    #[serde(rename_all = "camelCase")]
    UserMutedAudio { user_id: UserId, muted: bool },

    /// Peer video mute state.
    #[serde(rename_all = "camelCase")]
    UserMutedVideo { user_id: UserId, muted: bool },

    /// Peer screen share state.
    #[serde(rename_all = "camelCase")]
    UserScreenShare { user_id: UserId, sharing: bool },

    /// A participant started recording.
    #[serde(rename_all = "camelCase")]
    RecordingStarted { user_id: UserId },

    /// A participant stopped recording.
    #[serde(rename_all = "camelCase")]
    RecordingStopped { user_id: UserId },

    /// The call ended, broadcast to the remaining room members.
    #[serde(rename_all = "camelCase")]
    CallEnded { ended_by: UserId },

    /// Confirmation to the participant who ended the call.
    #[serde(rename_all = "camelCase")]
    CallEndedConfirmation { session_id: CallSessionId },

    /// The session was cancelled after a reported negotiation timeout.
    CallTimeout,

    /// A participant's connection dropped.
    #[serde(rename_all = "camelCase")]
    UserDisconnected { user_id: UserId },

    /// Relayed link quality report.
    #[serde(rename_all = "camelCase")]
    UserConnectionQuality { user_id: UserId, value: Value },

    /// Handler failure, sent to the originating connection only.
    Error { message: String },
}
