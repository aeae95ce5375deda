//! CareLink RTC - Real-time communication core of the CareLink telehealth
//! platform.
//!
//! This crate carries the platform's live traffic: chat relay, notification
//! push and call signaling over three isolated WebSocket channel spaces,
//! plus the call-session lifecycle state machine backed by the shared
//! record store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
