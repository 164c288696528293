//! Shared domain types for Stockdesk.
//!
//! This crate contains the types used across the chat/presence backend:
//! user identities and roles, chat messages, wire events, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod identity;
