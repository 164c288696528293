//! Per-user connection registry.
//!
//! The `ConnectionRegistry` maps a user id to the outbound queue of that
//! user's single live connection. Admitting a second connection for the same
//! id replaces the first; the evicted queue's sender is dropped, which ends
//! the evicted connection's writer and lets it close its socket.
//!
//! Delivery through the registry is best-effort and at-most-once: offline
//! users get nothing, and nothing is queued for later.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use stockdesk_types::event::ServerEvent;
use stockdesk_types::identity::{Identity, UserId};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors from writing to a registered connection's outbound queue.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The connection's writer has gone away; the entry is stale.
    #[error("connection for user {0} is closed")]
    ChannelClosed(UserId),

    /// The connection's outbound queue is full.
    #[error("outbound queue full for user {0}")]
    ChannelFull(UserId),
}

/// Identifies one admitted connection, distinct across replacements of the
/// same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

struct ConnectionEntry {
    connection_id: ConnectionId,
    sender: mpsc::Sender<ServerEvent>,
}

/// Shared map from user id to that user's active connection.
///
/// Backed by a sharded `DashMap`, so operations on unrelated users never
/// contend on a global lock.
pub struct ConnectionRegistry {
    connections: DashMap<UserId, ConnectionEntry>,
    next_connection_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Register `sender` as the active connection for `identity`.
    ///
    /// Any prior connection for the same id is silently replaced. The
    /// returned [`Registration`] releases the entry when dropped, unless a
    /// newer connection has replaced it in the meantime.
    pub fn admit(
        self: &Arc<Self>,
        identity: &Identity,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Registration {
        let connection_id =
            ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let previous = self.connections.insert(
            identity.id,
            ConnectionEntry {
                connection_id,
                sender,
            },
        );
        if let Some(previous) = previous {
            debug!(
                user_id = %identity.id,
                evicted = previous.connection_id.0,
                "replaced existing connection"
            );
        }
        debug!(user_id = %identity.id, connection = connection_id.0, "admitted connection");

        Registration {
            registry: Arc::clone(self),
            user_id: identity.id,
            connection_id,
        }
    }

    /// Whether `user_id` currently has a live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connections.contains_key(&user_id)
    }

    /// Push `event` to `user_id` if connected.
    ///
    /// Returns `Ok(false)` when the user is offline (no-op) and `Ok(true)`
    /// once the event is queued for the connection's writer. A write failure
    /// is returned to the caller; the entry is left in place for the
    /// connection's own teardown to remove.
    pub fn send_to(&self, user_id: UserId, event: ServerEvent) -> Result<bool, RegistryError> {
        // Clone the sender so the shard lock is released before writing.
        let sender = match self.connections.get(&user_id) {
            Some(entry) => entry.sender.clone(),
            None => return Ok(false),
        };

        sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RegistryError::ChannelFull(user_id),
            mpsc::error::TrySendError::Closed(_) => RegistryError::ChannelClosed(user_id),
        })?;

        Ok(true)
    }

    /// Drop the entry for `user_id`, whichever connection owns it.
    ///
    /// Idempotent: removing an absent id does nothing.
    pub fn remove(&self, user_id: UserId) {
        if self.connections.remove(&user_id).is_some() {
            debug!(%user_id, "removed connection");
        }
    }

    /// Drop the entry for `user_id` only if it still belongs to `connection_id`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn release(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(&user_id, |_, entry| entry.connection_id == connection_id)
            .is_some();
        if removed {
            debug!(%user_id, connection = connection_id.0, "released connection");
        }
        removed
    }

    /// Number of users currently connected.
    pub fn online_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("online", &self.connections.len())
            .finish()
    }
}

/// Guard for an admitted connection.
///
/// Dropping it releases the registry entry exactly once, on every exit path
/// of the connection task (peer close, protocol error, or unwinding).
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    user_id: UserId,
    connection_id: ConnectionId,
}

impl Registration {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.release(self.user_id, self.connection_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
