//! WebSocket handler for realtime chat.
//!
//! `GET /ws/chat?token=<jwt>` upgrades to a WebSocket and drives a
//! [`ConnectionSession`]:
//!
//! - **Handshake:** the token goes through the presence gate. On failure
//!   the client gets `{"error":"Authentication failed","details":...}`
//!   followed by a close frame with the policy-violation code (1008).
//! - **Writer task:** drains the connection's outbound queue into the
//!   socket. When the queue's last sender is dropped (this connection was
//!   replaced, or it is tearing down) the writer sends a close frame.
//! - **Reader:** text frames become [`InboundFrame::Text`] and are handled
//!   one at a time. Binary, ping and pong frames are ignored.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::Instrument;

use stockdesk_core::chat::{ConnectionSession, InboundFrame};
use stockdesk_types::error::AuthError;
use stockdesk_types::event::ServerEvent;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatSocketParams {
    pub token: Option<String>,
}

/// Upgrade an HTTP request to a chat WebSocket.
///
/// Mounted at `/ws/chat` in the router.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ChatSocketParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state, params.token))
}

async fn handle_chat_socket(socket: WebSocket, state: AppState, token: Option<String>) {
    let (mut ws_sender, ws_receiver) = socket.split();
    let mut session = ConnectionSession::new();

    let identity = match session.authenticate(&state.gate, token.as_deref()).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::info!(error = %err, "rejecting chat connection");
            reject(&mut ws_sender, &err).await;
            return;
        }
    };

    let span = tracing::info_span!("chat_connection", user_id = %identity.id);
    async move {
        let (tx, rx) = mpsc::channel(state.config.outbound_buffer.max(1));
        session.activate(&state.registry, tx);

        let mut writer = tokio::spawn(forward_events(ws_sender, rx).in_current_span());
        let inbound = ws_receiver.filter_map(|msg| async move { to_inbound(msg) });

        // The writer ending first means this connection was replaced or the
        // socket is unwritable; either way the session is over.
        let writer_done = tokio::select! {
            _ = session.run(&state.coordinator, inbound) => false,
            _ = &mut writer => true,
        };
        session.close();
        if !writer_done {
            let _ = writer.await;
        }
    }
    .instrument(span)
    .await;
}

/// Map a raw socket message to a session frame. `None` means ignore.
fn to_inbound(msg: Result<Message, axum::Error>) -> Option<InboundFrame> {
    match msg {
        Ok(Message::Text(text)) => Some(InboundFrame::Text(text.as_str().to_owned())),
        Ok(Message::Close(_)) => Some(InboundFrame::Closed),
        Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_)) => None,
        Err(err) => Some(InboundFrame::Failed(err.to_string())),
    }
}

/// Drain `rx` into the socket until every sender is gone, then close.
async fn forward_events(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerEvent>,
) {
    while let Some(event) = rx.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!("Failed to serialize ServerEvent: {err}");
                break;
            }
        };
        if ws_sender.send(Message::Text(json.into())).await.is_err() {
            tracing::debug!("chat socket closed while writing");
            return;
        }
    }
    let _ = ws_sender.send(Message::Close(None)).await;
}

async fn reject(ws_sender: &mut SplitSink<WebSocket, Message>, err: &AuthError) {
    for frame in rejection_frames(err) {
        if ws_sender.send(frame).await.is_err() {
            break;
        }
    }
}

/// The error body followed by a policy-violation close frame.
fn rejection_frames(err: &AuthError) -> [Message; 2] {
    let body = serde_json::json!({
        "error": "Authentication failed",
        "details": err.to_string(),
    });
    [
        Message::Text(body.to_string().into()),
        Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: "Authentication failed".into(),
        })),
    ]
}
