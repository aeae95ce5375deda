//! Application layer - orchestration between the Room Manager and ports.
//!
//! Two services carry the cross-channel logic: the message relay (fan-out
//! of chat messages with its two entry points) and the call lifecycle
//! coordinator (the per-conversation session state machine and the sole
//! consumer of the room-emptiness feed).

mod call_lifecycle;
mod relay;

pub use call_lifecycle::{CallJoin, CallLifecycleCoordinator};
pub use relay::MessageRelay;
