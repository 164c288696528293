//! Bearer token authentication extractor.
//!
//! Reads `Authorization: Bearer <token>` and runs it through the same
//! [`PresenceGate`](stockdesk_core::presence::PresenceGate) that admits
//! WebSocket connections, so REST callers face the same approval policy.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use stockdesk_types::identity::Identity;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller.
pub struct CurrentIdentity(pub Identity);

impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.gate.authenticate(token).await?;
        Ok(CurrentIdentity(identity))
    }
}

/// Extract the bearer token, if any. A present but non-bearer or non-UTF-8
/// header is rejected outright.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(|t| Some(t.trim()))
        .ok_or_else(|| {
            AppError::Unauthorized(
                "Provide the token via 'Authorization: Bearer <token>'".to_string(),
            )
        })
}
