//! Axum router configuration with middleware.
//!
//! REST routes live under `/api/v1/chat`; the realtime socket is `/ws/chat`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.frontend_url.as_deref());

    let chat_routes = Router::new()
        .route("/partners", get(handlers::chat::list_partners))
        .route("/history/{partner_id}", get(handlers::chat::get_history))
        .route("/messages", post(handlers::chat::send_message))
        .route("/read/{sender_id}", post(handlers::chat::mark_read))
        .route("/unread/count", get(handlers::chat::unread_count))
        .route("/unread", get(handlers::chat::unread_by_sender))
        .route("/presence/{user_id}", get(handlers::chat::get_presence));

    Router::new()
        .nest("/api/v1/chat", chat_routes)
        .route("/ws/chat", get(handlers::ws::chat_ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Allow any origin unless a frontend URL is configured and parses as a
/// header value.
fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match frontend_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "ignoring invalid frontend_url, allowing any origin");
            base.allow_origin(Any)
        }
        None => base.allow_origin(Any),
    }
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
