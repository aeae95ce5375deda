//! Domain layer: value objects and the call lifecycle aggregate.
//!
//! The external record store owns conversations, messages, and
//! notifications; their types here are read models the core relays. The
//! call session is the one aggregate this core actively mutates, always
//! through its state machine.

pub mod call;
pub mod conversation;
pub mod foundation;
pub mod message;
pub mod notification;

pub use call::{CallSession, CallSessionState};
pub use conversation::Conversation;
pub use message::{ConversationMessage, MessageKind, NewMessage};
pub use notification::Notification;
