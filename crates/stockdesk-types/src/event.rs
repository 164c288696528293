//! Wire events exchanged over a live chat connection.
//!
//! Inbound frames are decoded once into the closed [`ClientEvent`] sum type
//! before dispatch. Outbound frames are [`ServerEvent`] values, serialized
//! with a `type` tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::ChatMessageView;
use crate::error::ChatError;
use crate::identity::UserId;

/// Body of an inbound `chat` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatPayload {
    pub receiver_id: UserId,
    pub content: String,
}

/// Body of an inbound `read` event: the sender whose messages are now read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadPayload {
    pub sender_id: UserId,
}

/// A decoded client-to-server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Chat(ChatPayload),
    Read(ReadPayload),
    /// Well-formed JSON object carrying a `type` nobody handles.
    Unknown(String),
}

impl ClientEvent {
    /// Decode a raw text frame.
    ///
    /// A missing `type` field means `chat`. Invalid JSON, a non-object
    /// payload, or a known type with missing/ill-typed fields is
    /// [`ChatError::MalformedEvent`].
    pub fn decode(raw: &str) -> Result<Self, ChatError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|_| ChatError::MalformedEvent("Invalid JSON".to_string()))?;

        let kind = match value.as_object().map(|obj| obj.get("type")) {
            None => {
                return Err(ChatError::MalformedEvent(
                    "Event must be a JSON object".to_string(),
                ));
            }
            Some(None) => "chat".to_string(),
            Some(Some(Value::String(kind))) => kind.clone(),
            Some(Some(_)) => {
                return Err(ChatError::MalformedEvent(
                    "Event `type` must be a string".to_string(),
                ));
            }
        };

        match kind.as_str() {
            "chat" => serde_json::from_value(value)
                .map(ClientEvent::Chat)
                .map_err(|e| ChatError::MalformedEvent(format!("Invalid chat event: {e}"))),
            "read" => serde_json::from_value(value)
                .map(ClientEvent::Read)
                .map_err(|e| ChatError::MalformedEvent(format!("Invalid read event: {e}"))),
            _ => Ok(ClientEvent::Unknown(kind)),
        }
    }
}

/// A server-to-client event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A chat message, either delivered to the recipient or echoed to the sender.
    Chat(ChatMessageView),
    /// The reader has read the recipient's messages. Never carries message bodies.
    ReadReceipt {
        reader_id: UserId,
        reader_username: String,
    },
    /// Feedback for an event that could not be handled.
    Error { content: String },
}

impl ServerEvent {
    pub fn error(content: impl Into<String>) -> Self {
        ServerEvent::Error {
            content: content.into(),
        }
    }
}

impl From<&ChatError> for ServerEvent {
    fn from(err: &ChatError) -> Self {
        ServerEvent::error(err.to_string())
    }
}
