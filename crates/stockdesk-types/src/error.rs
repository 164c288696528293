use thiserror::Error;

use crate::identity::{ApprovalStatus, UserId};

/// Reasons an inbound connection or request is refused admission.
///
/// Every variant means the caller is unauthenticated; partial authentication
/// states never leave the gate.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authentication token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token does not resolve to a known user")]
    UnknownIdentity,

    #[error("account is {0}, awaiting admin approval")]
    NotApproved(ApprovalStatus),

    #[error("identity lookup failed: {0}")]
    Storage(String),
}

/// Errors surfaced to the sender of a chat event.
///
/// None of these close the connection.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(UserId),

    #[error("{0}")]
    MalformedEvent(String),

    #[error("Unknown message type: {0}")]
    UnknownEventType(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        ChatError::Store(e.to_string())
    }
}

/// Errors from repository operations (used by trait definitions in stockdesk-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(
            ChatError::UnknownEventType("typing".to_string()).to_string(),
            "Unknown message type: typing"
        );
        assert_eq!(
            ChatError::UnknownRecipient(UserId(99)).to_string(),
            "Unknown recipient: 99"
        );
    }

    #[test]
    fn test_auth_error_display() {
        let err = AuthError::NotApproved(ApprovalStatus::Pending);
        assert_eq!(err.to_string(), "account is pending, awaiting admin approval");
    }

    #[test]
    fn test_repository_error_converts_to_store_failure() {
        let err: ChatError = RepositoryError::Query("disk I/O error".to_string()).into();
        assert_eq!(err.to_string(), "store error: query error: disk I/O error");
    }
}
