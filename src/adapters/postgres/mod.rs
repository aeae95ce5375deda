//! PostgreSQL adapters for the record-store ports.

mod call_session_repository;
mod conversation_store;

pub use call_session_repository::PostgresCallSessionRepository;
pub use conversation_store::PostgresConversationStore;
