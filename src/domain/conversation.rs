//! Conversation read model.
//!
//! A conversation is the logical pairing of the two identities tied to an
//! appointment. The external record store owns it; this core only resolves
//! it to authorize room joins and to scope chat/call activity.

use serde::{Deserialize, Serialize};

use super::foundation::{ConversationId, UserId};

/// The participant pair of one conversation.
///
/// Exactly two identities by construction: telehealth conversations bind a
/// doctor and a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub doctor_id: UserId,
    pub patient_id: UserId,
}

impl Conversation {
    /// Creates a conversation read model.
    pub fn new(id: ConversationId, doctor_id: UserId, patient_id: UserId) -> Self {
        Self {
            id,
            doctor_id,
            patient_id,
        }
    }

    /// Returns true when the user is one of the two participants.
    pub fn is_participant(&self, user: &UserId) -> bool {
        &self.doctor_id == user || &self.patient_id == user
    }

    /// Returns the counterpart of the given participant, if any.
    pub fn other_participant(&self, user: &UserId) -> Option<&UserId> {
        if &self.doctor_id == user {
            Some(&self.patient_id)
        } else if &self.patient_id == user {
            Some(&self.doctor_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation::new(
            ConversationId::new(),
            UserId::new("doctor-1"),
            UserId::new("patient-1"),
        )
    }

    #[test]
    fn both_participants_are_recognized() {
        let conv = conversation();
        assert!(conv.is_participant(&UserId::new("doctor-1")));
        assert!(conv.is_participant(&UserId::new("patient-1")));
    }

    #[test]
    fn outsider_is_not_a_participant() {
        let conv = conversation();
        assert!(!conv.is_participant(&UserId::new("intruder")));
    }

    #[test]
    fn other_participant_returns_counterpart() {
        let conv = conversation();
        assert_eq!(
            conv.other_participant(&UserId::new("doctor-1")),
            Some(&UserId::new("patient-1"))
        );
        assert_eq!(
            conv.other_participant(&UserId::new("patient-1")),
            Some(&UserId::new("doctor-1"))
        );
        assert_eq!(conv.other_participant(&UserId::new("intruder")), None);
    }
}
