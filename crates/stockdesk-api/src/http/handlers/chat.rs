//! REST chat handlers.
//!
//! Endpoints (all under `/api/v1/chat`, bearer auth):
//! - GET  /partners             - Users the caller may chat with
//! - GET  /history/{partner_id} - Conversation with one partner, oldest first
//! - POST /messages             - Send a message (pushed live if the recipient is online)
//! - POST /read/{sender_id}     - Mark a sender's messages to the caller as read
//! - GET  /unread/count         - Number of unread messages for the caller
//! - GET  /unread               - Unread messages grouped by sender
//! - GET  /presence/{user_id}   - Whether a user has a live connection

use std::collections::BTreeMap;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use stockdesk_types::chat::ChatMessageView;
use stockdesk_types::identity::{PartnerSummary, UserId};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentIdentity;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: UserId,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked_read: u64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub user_id: UserId,
    pub online: bool,
}

/// GET /api/v1/chat/partners
pub async fn list_partners(
    State(state): State<AppState>,
    CurrentIdentity(me): CurrentIdentity,
) -> Result<Json<ApiResponse<Vec<PartnerSummary>>>, AppError> {
    let start = Instant::now();
    let partners = state.partners.list_partners(&me).await?;
    Ok(Json(ApiResponse::timed(partners, start)))
}

/// GET /api/v1/chat/history/{partner_id}
pub async fn get_history(
    State(state): State<AppState>,
    CurrentIdentity(me): CurrentIdentity,
    Path(partner_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ChatMessageView>>>, AppError> {
    let start = Instant::now();
    let history = state.coordinator.history(&me, UserId(partner_id)).await?;
    Ok(Json(ApiResponse::timed(history, start)))
}

/// POST /api/v1/chat/messages
///
/// Returns the stored message with `delivered` telling whether the recipient
/// got a live push.
pub async fn send_message(
    State(state): State<AppState>,
    CurrentIdentity(me): CurrentIdentity,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<ChatMessageView>>, AppError> {
    let start = Instant::now();

    let delivery = state
        .coordinator
        .send_chat(&me, req.receiver_id, &req.content)
        .await?
        .ok_or_else(|| AppError::Validation("Message content must not be empty".to_string()))?;

    Ok(Json(ApiResponse::timed(delivery.echo(), start)))
}

/// POST /api/v1/chat/read/{sender_id}
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentIdentity(me): CurrentIdentity,
    Path(sender_id): Path<i64>,
) -> Result<Json<ApiResponse<MarkReadResponse>>, AppError> {
    let start = Instant::now();
    let marked_read = state.coordinator.mark_read(&me, UserId(sender_id)).await?;
    Ok(Json(ApiResponse::timed(MarkReadResponse { marked_read }, start)))
}

/// GET /api/v1/chat/unread/count
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentIdentity(me): CurrentIdentity,
) -> Result<Json<ApiResponse<UnreadCountResponse>>, AppError> {
    let start = Instant::now();
    let unread_count = state.coordinator.unread_count(&me).await?;
    Ok(Json(ApiResponse::timed(UnreadCountResponse { unread_count }, start)))
}

/// GET /api/v1/chat/unread
///
/// Keys are sender ids rendered as strings (JSON object keys).
pub async fn unread_by_sender(
    State(state): State<AppState>,
    CurrentIdentity(me): CurrentIdentity,
) -> Result<Json<ApiResponse<BTreeMap<String, Vec<ChatMessageView>>>>, AppError> {
    let start = Instant::now();
    let grouped = state
        .coordinator
        .unread_by_sender(&me)
        .await?
        .into_iter()
        .map(|(sender, views)| (sender.to_string(), views))
        .collect();
    Ok(Json(ApiResponse::timed(grouped, start)))
}

/// GET /api/v1/chat/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    CurrentIdentity(_me): CurrentIdentity,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<PresenceResponse>>, AppError> {
    let start = Instant::now();
    let user_id = UserId(user_id);
    let online = state.registry.is_online(user_id);
    Ok(Json(ApiResponse::timed(PresenceResponse { user_id, online }, start)))
}
