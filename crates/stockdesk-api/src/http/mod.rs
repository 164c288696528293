//! HTTP layer for StockDesk.
//!
//! Axum router serving the chat WebSocket at `/ws/chat` and the REST chat
//! API under `/api/v1/chat`, with bearer-token authentication, envelope
//! responses, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
