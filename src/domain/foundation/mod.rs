//! Foundation value objects shared across the domain.
//!
//! Strongly-typed identifiers, the connection `Identity`, timestamps, and
//! the error taxonomy. Everything here is dependency-free domain vocabulary.

mod errors;
mod identity;
mod ids;
mod timestamp;

pub use errors::{AuthError, RealtimeError};
pub use identity::{AuthenticatedUser, Identity, UserRole};
pub use ids::{CallSessionId, ConversationId, MessageId, NotificationId, UserId};
pub use timestamp::Timestamp;
