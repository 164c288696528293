//! Chat message types.
//!
//! `ChatMessage` is the persisted row; `ChatMessageView` is the wire shape
//! pushed over the socket and returned by the REST surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// A persisted direct message between two users.
///
/// `is_read` only ever flips from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

/// A message about to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl NewChatMessage {
    /// Build an unread message stamped with the current time.
    pub fn now(sender_id: UserId, receiver_id: UserId, content: impl Into<String>) -> Self {
        Self {
            sender_id,
            receiver_id,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(self, id: i64) -> ChatMessage {
        ChatMessage {
            id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            timestamp: self.timestamp,
            is_read: false,
        }
    }
}

/// Outbound representation of a message.
///
/// `delivered` is only present on the echo returned to the sender and tells
/// whether the recipient had a live connection when the message was pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageView {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub sender_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered: Option<bool>,
}

impl ChatMessageView {
    pub fn from_message(message: ChatMessage, sender_username: impl Into<String>) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            timestamp: message.timestamp,
            is_read: message.is_read,
            sender_username: sender_username.into(),
            delivered: None,
        }
    }

    /// Copy of this view carrying the delivery outcome, for the sender's echo.
    pub fn with_delivered(mut self, delivered: bool) -> Self {
        self.delivered = Some(delivered);
        self
    }
}

/// Result of a send: the persisted message and whether the recipient got a push.
#[derive(Debug, Clone)]
pub struct ChatDelivery {
    pub message: ChatMessageView,
    pub delivered: bool,
}

impl ChatDelivery {
    /// The echo sent back to the sender (message plus `delivered`).
    pub fn echo(&self) -> ChatMessageView {
        self.message.clone().with_delivered(self.delivered)
    }
}
