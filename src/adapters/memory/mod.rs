//! In-memory adapters.
//!
//! Lock-guarded hash maps behind the same ports the Postgres adapters
//! implement. Used by local development wiring and by tests that exercise
//! the relay and lifecycle paths without a database.

mod call_sessions;
mod record_store;

pub use call_sessions::InMemoryCallSessions;
pub use record_store::InMemoryRecordStore;
