//! Notification read model.
//!
//! Created and persisted by the external store; the core mirrors the row to
//! the recipient's personal room on the notification channel.

use serde::{Deserialize, Serialize};

use super::foundation::{NotificationId, Timestamp, UserId};

/// One persisted notification, as relayed over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,

    /// Category string decided by the producer ("appointment_reminder",
    /// "new_review", ...). Opaque to this core.
    pub kind: String,

    /// Producer-defined payload, forwarded verbatim.
    pub body: serde_json::Value,

    pub created_at: Timestamp,
}

impl Notification {
    /// Creates a notification row as the persistence collaborator would.
    pub fn new(recipient_id: UserId, kind: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: NotificationId::new(),
            recipient_id,
            kind: kind.into(),
            body,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_is_forwarded_verbatim() {
        let n = Notification::new(
            UserId::new("patient-1"),
            "appointment_reminder",
            json!({"appointmentId": 42, "at": "2025-03-01T09:00:00Z"}),
        );

        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"recipientId\":\"patient-1\""));
        assert!(json.contains("\"appointmentId\":42"));
    }
}
