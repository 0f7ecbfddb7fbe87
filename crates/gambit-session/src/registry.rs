//! The connection registry: at most one live connection per user.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is NOT thread-safe by itself; it uses a plain
//! `HashMap`. It is owned by the server state behind a `tokio::sync::Mutex`
//! and every access is an explicit, short critical section; nothing awaits
//! while holding the lock.

use std::collections::HashMap;

use gambit_protocol::{ServerEvent, UserId};
use gambit_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender delivering outbound events to one connection's writer
/// task.
pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

struct Peer {
    conn: ConnectionId,
    sender: ClientSender,
}

/// Maps each authenticated user to their current live connection.
///
/// The invariant is one entry per `UserId`. A second authentication for
/// the same identity **supersedes** the first: the mapping is overwritten
/// and the old connection is simply no longer reachable through the
/// registry (it is not closed explicitly). The stored [`ConnectionId`]
/// is what lets a superseded connection's eventual disconnect be told
/// apart from the live one's, see [`ConnectionRegistry::unbind`].
pub struct ConnectionRegistry {
    peers: HashMap<UserId, Peer>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Binds a user to a connection, superseding any previous binding.
    ///
    /// Returns the [`ConnectionId`] of the superseded connection, if
    /// there was one.
    pub fn bind(
        &mut self,
        user: UserId,
        conn: ConnectionId,
        sender: ClientSender,
    ) -> Option<ConnectionId> {
        let old = self.peers.insert(user, Peer { conn, sender });
        match old {
            Some(prev) => {
                tracing::info!(
                    %user,
                    %conn,
                    superseded = %prev.conn,
                    "connection rebound"
                );
                Some(prev.conn)
            }
            None => {
                tracing::info!(%user, %conn, "connection bound");
                None
            }
        }
    }

    /// Removes the binding for `user`, but only if it still belongs to
    /// `conn`. Returns `true` if an entry was removed.
    ///
    /// This makes disconnect cleanup idempotent: when a stale connection
    /// (already superseded by a newer one for the same user) finally
    /// dies, its cleanup finds a different `ConnectionId` in the map and
    /// leaves the newer binding untouched.
    pub fn unbind(&mut self, user: UserId, conn: ConnectionId) -> bool {
        match self.peers.get(&user) {
            Some(peer) if peer.conn == conn => {
                self.peers.remove(&user);
                tracing::info!(%user, %conn, "connection unbound");
                true
            }
            Some(peer) => {
                tracing::debug!(
                    %user,
                    stale = %conn,
                    current = %peer.conn,
                    "ignoring unbind from superseded connection"
                );
                false
            }
            None => false,
        }
    }

    /// Pushes an event to a user's connection. Returns `false` if the
    /// user is offline or their writer task is gone.
    pub fn send_to(&self, user: UserId, event: ServerEvent) -> bool {
        match self.peers.get(&user) {
            Some(peer) => peer.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// A clone of the user's outbound sender, if they are online.
    pub fn sender(&self, user: UserId) -> Option<ClientSender> {
        self.peers.get(&user).map(|p| p.sender.clone())
    }

    /// Whether the user currently has a live connection.
    ///
    /// Presence is derived entirely from registry membership; a
    /// dead-but-not-yet-detected connection still counts as online.
    pub fn is_online(&self, user: UserId) -> bool {
        self.peers.contains_key(&user)
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no one is connected.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
