//! Infrastructure layer for StockDesk.
//!
//! Implements the ports defined in `stockdesk-core`: SQLite user and message
//! storage, JWT-backed identity resolution, plus configuration loading and
//! data directory resolution.

pub mod auth;
pub mod config;
pub mod filesystem;
pub mod sqlite;
