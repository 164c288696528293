//! HTTP and WebSocket request handlers.

pub mod chat;
pub mod ws;
