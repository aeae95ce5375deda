//! Adapters - implementations of ports and the transport layer.
//!
//! - `auth` - session validators (JWT, mock)
//! - `memory` - in-memory stores for tests and local development
//! - `postgres` - sqlx-backed record store and call session repository
//! - `websocket` - axum transport, gateway, rooms and channel spaces

pub mod auth;
pub mod memory;
pub mod postgres;
pub mod websocket;
