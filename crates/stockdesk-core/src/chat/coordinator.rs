//! Message delivery coordination.
//!
//! The `DeliveryCoordinator` is shared by every connection task and by the
//! REST handlers. For each inbound event it validates, persists through the
//! [`MessageStore`], then pushes through the [`ConnectionRegistry`]:
//!
//! - **chat:** persist the message unread, push it to the recipient if
//!   online, echo it to the sender with `delivered` set to the push outcome.
//! - **read:** flip the reader's unread messages from one sender to read and
//!   notify that sender with a `read_receipt` if online.
//!
//! Persistence always commits before any push is attempted. Errors never
//! escape [`DeliveryCoordinator::handle_frame`]: they become an `error`
//! event addressed to the initiating user.

use std::collections::BTreeMap;
use std::sync::Arc;

use stockdesk_types::chat::{ChatDelivery, ChatMessageView, NewChatMessage};
use stockdesk_types::error::ChatError;
use stockdesk_types::event::{ClientEvent, ServerEvent};
use stockdesk_types::identity::{Identity, UserId};
use tracing::{debug, warn};

use crate::presence::ConnectionRegistry;
use crate::repository::message::MessageStore;
use crate::repository::user::UserRepository;

/// Orchestrates persistence and best-effort push for chat events.
///
/// Generic over `UserRepository` and `MessageStore` so stockdesk-core never
/// depends on stockdesk-infra.
pub struct DeliveryCoordinator<U: UserRepository, M: MessageStore> {
    users: U,
    messages: M,
    registry: Arc<ConnectionRegistry>,
}

impl<U: UserRepository, M: MessageStore> DeliveryCoordinator<U, M> {
    pub fn new(users: U, messages: M, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            users,
            messages,
            registry,
        }
    }

    /// Access the shared connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    // --- Realtime path ---

    /// Handle one raw text frame from `sender`'s connection.
    ///
    /// Decodes, dispatches, and reports any failure back to the sender as an
    /// `error` event. Never fails: the connection stays usable afterwards.
    pub async fn handle_frame(&self, sender: &Identity, raw: &str) {
        let outcome = match ClientEvent::decode(raw) {
            Ok(event) => self.handle_event(sender, event).await,
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            warn!(user_id = %sender.id, error = %err, "chat event failed");
            self.push(sender.id, ServerEvent::from(&err));
        }
    }

    /// Dispatch a decoded event on behalf of `sender`.
    pub async fn handle_event(&self, sender: &Identity, event: ClientEvent) -> Result<(), ChatError> {
        match event {
            ClientEvent::Chat(payload) => {
                match self
                    .send_chat(sender, payload.receiver_id, &payload.content)
                    .await?
                {
                    Some(delivery) => {
                        self.push(sender.id, ServerEvent::Chat(delivery.echo()));
                    }
                    None => {
                        debug!(user_id = %sender.id, "dropping chat event with empty content");
                    }
                }
                Ok(())
            }
            ClientEvent::Read(payload) => {
                let count = self.mark_read(sender, payload.sender_id).await?;
                debug!(reader = %sender.id, sender = %payload.sender_id, count, "marked messages read");
                Ok(())
            }
            ClientEvent::Unknown(kind) => Err(ChatError::UnknownEventType(kind)),
        }
    }

    // --- Operations shared with the REST surface ---

    /// Persist a message from `sender` to `receiver_id` and push it if the
    /// recipient is online.
    ///
    /// The recipient is validated first. A known recipient with empty or
    /// whitespace content yields `Ok(None)` and nothing is persisted. The
    /// sender's echo is left to the caller.
    pub async fn send_chat(
        &self,
        sender: &Identity,
        receiver_id: UserId,
        content: &str,
    ) -> Result<Option<ChatDelivery>, ChatError> {
        if self.users.get_by_id(receiver_id).await?.is_none() {
            return Err(ChatError::UnknownRecipient(receiver_id));
        }

        if content.trim().is_empty() {
            return Ok(None);
        }

        let stored = self
            .messages
            .insert(&NewChatMessage::now(sender.id, receiver_id, content))
            .await?;
        let view = ChatMessageView::from_message(stored, sender.username.clone());

        let delivered = self.push(receiver_id, ServerEvent::Chat(view.clone()));
        debug!(
            message_id = view.id,
            sender = %sender.id,
            receiver = %receiver_id,
            delivered,
            "chat message stored"
        );

        Ok(Some(ChatDelivery {
            message: view,
            delivered,
        }))
    }

    /// Mark every unread message from `sender_id` to `reader` as read.
    ///
    /// Commits first, then sends a `read_receipt` to `sender_id` if online.
    /// Returns the number of messages that flipped to read.
    pub async fn mark_read(&self, reader: &Identity, sender_id: UserId) -> Result<u64, ChatError> {
        let count = self.messages.mark_read(sender_id, reader.id).await?;

        self.push(
            sender_id,
            ServerEvent::ReadReceipt {
                reader_id: reader.id,
                reader_username: reader.username.clone(),
            },
        );

        Ok(count)
    }

    /// Conversation between `viewer` and `partner_id`, oldest first.
    pub async fn history(
        &self,
        viewer: &Identity,
        partner_id: UserId,
    ) -> Result<Vec<ChatMessageView>, ChatError> {
        let partner = self
            .users
            .get_by_id(partner_id)
            .await?
            .ok_or(ChatError::UnknownRecipient(partner_id))?;

        let messages = self.messages.history(viewer.id, partner_id).await?;
        Ok(messages
            .into_iter()
            .map(|m| {
                let name = if m.sender_id == viewer.id {
                    viewer.username.clone()
                } else {
                    partner.username.clone()
                };
                ChatMessageView::from_message(m, name)
            })
            .collect())
    }

    /// Number of unread messages addressed to `identity`.
    pub async fn unread_count(&self, identity: &Identity) -> Result<u64, ChatError> {
        Ok(self.messages.unread_count_for(identity.id).await?)
    }

    /// Unread messages addressed to `identity`, grouped by sender.
    pub async fn unread_by_sender(
        &self,
        identity: &Identity,
    ) -> Result<BTreeMap<UserId, Vec<ChatMessageView>>, ChatError> {
        let grouped = self.messages.unread_grouped_by_sender(identity.id).await?;

        let mut views = BTreeMap::new();
        for (sender_id, messages) in grouped {
            let username = self
                .users
                .get_by_id(sender_id)
                .await?
                .map(|a| a.username)
                .unwrap_or_default();
            views.insert(
                sender_id,
                messages
                    .into_iter()
                    .map(|m| ChatMessageView::from_message(m, username.clone()))
                    .collect(),
            );
        }
        Ok(views)
    }

    /// Best-effort push. Returns whether the event reached a live connection.
    fn push(&self, user_id: UserId, event: ServerEvent) -> bool {
        match self.registry.send_to(user_id, event) {
            Ok(delivered) => delivered,
            Err(err) => {
                warn!(%user_id, error = %err, "push failed");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
