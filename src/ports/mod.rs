//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the real-time core and the outside world. Adapters implement them.
//!
//! - `SessionValidator` - token validation for the connection gateway
//! - `ConversationStore` - conversation/message lookup for authorization
//!   and read receipts
//! - `CallSessionRepository` - atomic call session persistence

mod call_session_repository;
mod conversation_store;
mod session_validator;

pub use call_session_repository::{
    ActiveSession, CallSessionRepository, CallSessionRepositoryError,
};
pub use conversation_store::{ConversationStore, ConversationStoreError};
pub use session_validator::SessionValidator;
