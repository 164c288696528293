//! Business logic and port traits for StockDesk chat.
//!
//! This crate defines the repository and identity ports that the
//! infrastructure layer implements, plus the presence and delivery logic
//! built on top of them. It depends only on `stockdesk-types` -- never on
//! `stockdesk-infra` or any database/IO crate.

pub mod chat;
pub mod presence;
pub mod repository;

#[cfg(test)]
mod testing;
