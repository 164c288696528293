//! Message store trait definition.
//!
//! The store is the sole writer of durable chat state. Each call is its own
//! transaction, committed before the caller attempts any push, so a failed
//! push never needs to roll anything back.

use std::collections::BTreeMap;

use stockdesk_types::chat::{ChatMessage, NewChatMessage};
use stockdesk_types::error::RepositoryError;
use stockdesk_types::identity::UserId;

/// Repository trait for direct chat message persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait MessageStore: Send + Sync {
    /// Persist a new unread message and return it with its assigned id.
    fn insert(
        &self,
        message: &NewChatMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Mark every unread message from `sender_id` to `receiver_id` as read.
    ///
    /// Returns the number of rows that flipped. Calling it again returns 0.
    fn mark_read(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Messages between two users in either direction, oldest first.
    fn history(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Number of unread messages addressed to `user_id`.
    fn unread_count_for(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Unread messages addressed to `user_id`, keyed by sender, oldest first.
    fn unread_grouped_by_sender(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<
        Output = Result<BTreeMap<UserId, Vec<ChatMessage>>, RepositoryError>,
    > + Send;
}
