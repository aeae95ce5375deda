//! WebSocket adapter: transport, gateway, rooms and the three channel
//! spaces (chat, notifications, call signaling).

mod call;
mod chat;
mod gateway;
mod handler;
mod messages;
mod notifications;
mod rooms;

pub use call::CallChannel;
pub use chat::ChatChannel;
pub use gateway::{ConnectParams, ConnectionGateway};
pub use handler::{router, serve_channel, Channel, RealtimeApp};
pub use messages::{
    CallClientEvent, CallServerEvent, ChatClientEvent, ChatServerEvent,
    NotificationClientEvent, NotificationServerEvent, SignalKind,
};
pub use notifications::NotificationChannel;
pub use rooms::{ConnectionId, RemovedConnection, RoomId, RoomManager};
