//! Conversation message model.
//!
//! Message rows live in the external record store. They reach the relay two
//! ways: already persisted (pushed by the REST side) or as a `NewMessage`
//! draft sent in-band, which the store turns into a row before relay. The
//! structs mirror the stored shape one-to-one.

use serde::{Deserialize, Serialize};

use super::foundation::{ConversationId, MessageId, Timestamp, UserId};

/// Payload kind of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

/// One persisted conversation message, as relayed over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,

    /// Present when the message is scoped to an appointment conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,

    pub content: String,

    #[serde(default)]
    pub kind: MessageKind,

    /// Reference to an uploaded file for image/file messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    /// Set by the external store once the receiver acknowledged the row.
    #[serde(default)]
    pub delivered: bool,

    pub created_at: Timestamp,
}

/// Draft of a message sent in-band over the chat channel.
///
/// The record store assigns the id and creation time when persisting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,

    pub content: String,

    #[serde(default)]
    pub kind: MessageKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl NewMessage {
    /// The row this draft becomes once the store assigns id and timestamp.
    pub fn into_message(self) -> ConversationMessage {
        ConversationMessage {
            id: MessageId::new(),
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            conversation_id: self.conversation_id,
            content: self.content,
            kind: self.kind,
            file_id: self.file_id,
            delivered: false,
            created_at: Timestamp::now(),
        }
    }
}

impl ConversationMessage {
    /// Creates a text message row as the persistence collaborator would.
    pub fn text(
        sender_id: UserId,
        receiver_id: UserId,
        conversation_id: Option<ConversationId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender_id,
            receiver_id,
            conversation_id,
            content: content.into(),
            kind: MessageKind::Text,
            file_id: None,
            delivered: false,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_constructor_fills_defaults() {
        let msg = ConversationMessage::text(
            UserId::new("a"),
            UserId::new("b"),
            None,
            "hello",
        );

        assert_eq!(msg.kind, MessageKind::Text);
        assert!(!msg.delivered);
        assert!(msg.file_id.is_none());
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn serializes_camel_case_and_omits_absent_conversation() {
        let msg = ConversationMessage::text(
            UserId::new("a"),
            UserId::new("b"),
            None,
            "hi",
        );

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"senderId\":\"a\""));
        assert!(json.contains("\"receiverId\":\"b\""));
        assert!(!json.contains("conversationId"));
    }

    #[test]
    fn conversation_reference_survives_round_trip() {
        let conv = ConversationId::new();
        let msg = ConversationMessage::text(
            UserId::new("a"),
            UserId::new("b"),
            Some(conv),
            "scoped",
        );

        let json = serde_json::to_string(&msg).unwrap();
        let back: ConversationMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.conversation_id, Some(conv));
    }

    #[test]
    fn message_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&MessageKind::File).unwrap(), "\"file\"");
    }
}
