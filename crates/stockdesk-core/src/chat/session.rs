//! Per-connection session state machine.
//!
//! A `ConnectionSession` walks one live connection through
//! `Connecting -> Authenticated -> Active -> Closed`. While active it reads
//! inbound frames one at a time and hands each to the
//! [`DeliveryCoordinator`], awaiting completion before reading the next.
//! Whatever ends the session, its registry entry is released exactly once.

use std::fmt;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use stockdesk_types::error::AuthError;
use stockdesk_types::event::ServerEvent;
use stockdesk_types::identity::Identity;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::coordinator::DeliveryCoordinator;
use crate::presence::{ConnectionRegistry, IdentityResolver, PresenceGate, Registration};
use crate::repository::message::MessageStore;
use crate::repository::user::UserRepository;

/// Where a connection is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Authenticated,
    Active,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Connecting => "connecting",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Active => "active",
            SessionPhase::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// A transport-neutral inbound frame.
///
/// The transport maps its own frame types onto this; anything that is not
/// text, a close, or a failure is filtered out before reaching the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Closed,
    Failed(String),
}

/// State for one live connection.
pub struct ConnectionSession {
    phase: SessionPhase,
    identity: Option<Identity>,
    registration: Option<Registration>,
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connecting,
            identity: None,
            registration: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The authenticated identity, once past `Connecting`.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Run the handshake token through the gate.
    ///
    /// On failure the session moves straight to `Closed`; the transport is
    /// expected to report the error and close with a policy-violation code.
    pub async fn authenticate<R: IdentityResolver>(
        &mut self,
        gate: &PresenceGate<R>,
        token: Option<&str>,
    ) -> Result<Identity, AuthError> {
        match gate.authenticate(token).await {
            Ok(identity) => {
                self.identity = Some(identity.clone());
                self.phase = SessionPhase::Authenticated;
                Ok(identity)
            }
            Err(err) => {
                debug!(error = %err, "connection refused at handshake");
                self.phase = SessionPhase::Closed;
                Err(err)
            }
        }
    }

    /// Register this connection's outbound queue and become `Active`.
    ///
    /// Returns `false` without registering when the session is not
    /// authenticated.
    pub fn activate(
        &mut self,
        registry: &Arc<ConnectionRegistry>,
        sender: mpsc::Sender<ServerEvent>,
    ) -> bool {
        let Some(identity) = self.identity.as_ref() else {
            return false;
        };
        if self.phase != SessionPhase::Authenticated {
            return false;
        }

        self.registration = Some(registry.admit(identity, sender));
        self.phase = SessionPhase::Active;
        info!(user_id = %identity.id, username = %identity.username, "connection active");
        true
    }

    /// Drive the active session until the peer closes or the stream fails.
    ///
    /// Frames are handled strictly in order. Returns once the session is
    /// `Closed`, with its registry entry already released.
    pub async fn run<U, M, S>(&mut self, coordinator: &DeliveryCoordinator<U, M>, inbound: S)
    where
        U: UserRepository,
        M: MessageStore,
        S: Stream<Item = InboundFrame>,
    {
        let Some(identity) = self.identity.clone() else {
            self.close();
            return;
        };
        if self.phase != SessionPhase::Active {
            self.close();
            return;
        }

        let mut inbound = std::pin::pin!(inbound);
        while let Some(frame) = inbound.next().await {
            match frame {
                InboundFrame::Text(raw) => coordinator.handle_frame(&identity, &raw).await,
                InboundFrame::Closed => {
                    debug!(user_id = %identity.id, "peer closed connection");
                    break;
                }
                InboundFrame::Failed(reason) => {
                    warn!(user_id = %identity.id, %reason, "connection failed");
                    break;
                }
            }
        }

        self.close();
    }

    /// Release the registry entry and move to `Closed`. Idempotent.
    pub fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        if let Some(registration) = self.registration.take() {
            info!(user_id = %registration.user_id(), "connection closed");
        }
        self.phase = SessionPhase::Closed;
    }
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("phase", &self.phase)
            .field("user_id", &self.identity.as_ref().map(|i| i.id))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryMessages, InMemoryUsers, StaticResolver, account};
    use futures_util::stream;
    use stockdesk_types::identity::{ApprovalStatus, Role, UserId};

    struct World {
        gate: PresenceGate<StaticResolver>,
        coordinator: DeliveryCoordinator<InMemoryUsers, InMemoryMessages>,
        messages: InMemoryMessages,
    }

    fn world() -> World {
        let admin = account(1, "admin", Role::Admin, ApprovalStatus::Approved);
        let client = account(2, "client", Role::Client, ApprovalStatus::Approved);
        let pending = account(3, "pending", Role::Client, ApprovalStatus::Pending);
        let gate = PresenceGate::new(
            StaticResolver::new()
                .with_token("t-admin", admin.clone())
                .with_token("t-client", client.clone())
                .with_token("t-pending", pending.clone()),
        );
        let messages = InMemoryMessages::new();
        let coordinator = DeliveryCoordinator::new(
            InMemoryUsers::with(vec![admin, client, pending]),
            messages.clone(),
            Arc::new(ConnectionRegistry::new()),
        );
        World {
            gate,
            coordinator,
            messages,
        }
    }

    async fn open(
        w: &World,
        token: &str,
    ) -> (ConnectionSession, mpsc::Receiver<ServerEvent>) {
        let mut session = ConnectionSession::new();
        session.authenticate(&w.gate, Some(token)).await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        assert!(session.activate(w.coordinator.registry(), tx));
        (session, rx)
    }

    fn text(raw: &str) -> InboundFrame {
        InboundFrame::Text(raw.to_string())
    }

    #[tokio::test]
    async fn failed_authentication_closes_session() {
        let w = world();
        let mut session = ConnectionSession::new();
        assert_eq!(session.phase(), SessionPhase::Connecting);

        let err = session.authenticate(&w.gate, Some("t-pending")).await.unwrap_err();
        assert!(matches!(err, AuthError::NotApproved(ApprovalStatus::Pending)));
        assert_eq!(session.phase(), SessionPhase::Closed);

        let (tx, _rx) = mpsc::channel(1);
        assert!(!session.activate(w.coordinator.registry(), tx));
        assert_eq!(w.coordinator.registry().online_count(), 0);
    }

    #[tokio::test]
    async fn run_handles_frames_then_releases_on_close() {
        let w = world();
        let (mut session, mut rx) = open(&w, "t-client").await;
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(w.coordinator.registry().is_online(UserId(2)));

        let frames = stream::iter(vec![
            text("garbage"),
            text(r#"{"type":"chat","receiver_id":1,"content":"still works"}"#),
            InboundFrame::Closed,
            text(r#"{"type":"chat","receiver_id":1,"content":"never read"}"#),
        ]);
        session.run(&w.coordinator, frames).await;

        assert_eq!(session.phase(), SessionPhase::Closed);
        assert!(!w.coordinator.registry().is_online(UserId(2)));

        assert_eq!(rx.recv().await.unwrap(), ServerEvent::error("Invalid JSON"));
        match rx.recv().await.unwrap() {
            ServerEvent::Chat(echo) => {
                assert_eq!(echo.content, "still works");
                assert_eq!(echo.delivered, Some(false));
            }
            other => panic!("expected echo, got {other:?}"),
        }
        assert_eq!(w.messages.all().len(), 1);
    }

    #[tokio::test]
    async fn stream_failure_also_releases() {
        let w = world();
        let (mut session, _rx) = open(&w, "t-admin").await;

        session
            .run(&w.coordinator, stream::iter(vec![InboundFrame::Failed("reset".into())]))
            .await;

        assert_eq!(session.phase(), SessionPhase::Closed);
        assert!(!w.coordinator.registry().is_online(UserId(1)));
        session.close();
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[tokio::test]
    async fn closing_evicted_session_keeps_replacement_online() {
        let w = world();
        let (mut first, mut first_rx) = open(&w, "t-client").await;
        let (_second, mut second_rx) = open(&w, "t-client").await;

        // The evicted queue is closed once the registry drops its sender.
        assert!(first_rx.recv().await.is_none());
        first.close();

        assert!(w.coordinator.registry().is_online(UserId(2)));
        w.coordinator
            .send_chat(
                &account(1, "admin", Role::Admin, ApprovalStatus::Approved).identity(),
                UserId(2),
                "for the new tab",
            )
            .await
            .unwrap();
        assert!(matches!(second_rx.recv().await, Some(ServerEvent::Chat(_))));
    }

    #[tokio::test]
    async fn end_to_end_offline_then_online_read_receipt() {
        let w = world();
        let (mut admin, mut admin_rx) = open(&w, "t-admin").await;

        // Client offline: message stored unread, echo reports not delivered.
        w.coordinator
            .handle_frame(
                admin.identity().unwrap(),
                r#"{"type":"chat","receiver_id":2,"content":"hi"}"#,
            )
            .await;
        match admin_rx.recv().await.unwrap() {
            ServerEvent::Chat(echo) => assert_eq!(echo.delivered, Some(false)),
            other => panic!("expected echo, got {other:?}"),
        }
        assert_eq!(w.messages.all()[0].content, "hi");
        assert!(!w.messages.all()[0].is_read);

        // Client connects and reads.
        let (mut client, _client_rx) = open(&w, "t-client").await;
        client
            .run(
                &w.coordinator,
                stream::iter(vec![text(r#"{"type":"read","sender_id":1}"#)]),
            )
            .await;

        assert!(w.messages.all()[0].is_read);
        assert_eq!(
            admin_rx.recv().await.unwrap(),
            ServerEvent::ReadReceipt {
                reader_id: UserId(2),
                reader_username: "client".to_string(),
            }
        );

        // Stream ended without an explicit close frame: still cleaned up.
        assert!(!w.coordinator.registry().is_online(UserId(2)));
        admin.close();
        assert_eq!(w.coordinator.registry().online_count(), 0);
    }
}
