//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use stockdesk_types::error::{AuthError, ChatError, RepositoryError};

use crate::http::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid, or unresolvable bearer token.
    Unauthorized(String),
    /// Authenticated, but the account is not approved.
    Forbidden(String),
    UnknownRecipient(String),
    Validation(String),
    Store(String),
    Internal(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            AppError::UnknownRecipient(msg) => (StatusCode::NOT_FOUND, "UNKNOWN_RECIPIENT", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Store(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotApproved(_) => AppError::Forbidden(e.to_string()),
            AuthError::Storage(msg) => AppError::Store(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::UnknownRecipient(_) => AppError::UnknownRecipient(e.to_string()),
            ChatError::MalformedEvent(msg) => AppError::Validation(msg),
            ChatError::UnknownEventType(_) => AppError::Validation(e.to_string()),
            ChatError::Store(msg) => AppError::Store(msg),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Store(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::warn!(code, %message, "request failed");
        }
        let body = ApiResponse::error(code, message, uuid::Uuid::now_v7().to_string(), 0);
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockdesk_types::identity::{ApprovalStatus, UserId};

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn auth_errors_map_to_401_or_403() {
        assert_eq!(status_of(AuthError::MissingToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AuthError::InvalidToken("expired".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AuthError::NotApproved(ApprovalStatus::Pending).into()),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn chat_errors_map_to_status_codes() {
        assert_eq!(
            status_of(ChatError::UnknownRecipient(UserId(9)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ChatError::MalformedEvent("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ChatError::Store("locked".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unknown_recipient_keeps_message() {
        let err: AppError = ChatError::UnknownRecipient(UserId(9)).into();
        let (_, code, message) = err.parts();
        assert_eq!(code, "UNKNOWN_RECIPIENT");
        assert_eq!(message, "Unknown recipient: 9");
    }
}
