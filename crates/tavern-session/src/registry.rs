//! The connection registry: which live connection holds which role.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain data structure with no locking. The
//! router owns it together with the membership manager behind a single
//! mutex, so a join and a disconnect can never interleave half-way.

use std::collections::HashMap;

use tavern_protocol::PlayerId;
use tavern_transport::ConnectionId;

use crate::{Identity, SessionError};

/// Tracks every live connection and the role it has claimed.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ [unidentified] ──set_identity()──→ [host | player N]
///     │                                                   │
///     └──────────────── unregister() ◄────────────────────┘
/// ```
///
/// Two bindings are kept alongside the per-connection entries: a single
/// host slot, and one connection per player id. Both are last-writer-wins.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Every registered connection. `None` until it joins.
    connections: HashMap<ConnectionId, Option<Identity>>,

    /// The connection currently holding the host role.
    host: Option<ConnectionId>,

    /// The connection currently bound to each player id.
    players: HashMap<PlayerId, ConnectionId>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new live connection with no role yet.
    ///
    /// Calling it again for an already registered connection is a no-op:
    /// the existing entry, including any identity, is kept. Returns `true`
    /// if the connection was newly added.
    pub fn register(&mut self, conn_id: ConnectionId) -> bool {
        if self.connections.contains_key(&conn_id) {
            return false;
        }
        self.connections.insert(conn_id, None);
        tracing::debug!(%conn_id, "connection registered");
        true
    }

    /// Removes a connection and any host/player binding it held.
    ///
    /// Safe to call for a connection that was never registered. Returns the
    /// identity the connection held, if any.
    pub fn unregister(&mut self, conn_id: ConnectionId) -> Option<Identity> {
        self.release_bindings(conn_id);
        let identity = self.connections.remove(&conn_id).flatten();
        tracing::debug!(%conn_id, "connection unregistered");
        identity
    }

    /// Assigns a role to a registered connection.
    ///
    /// - Host: overwrites the host slot.
    /// - Player: overwrites the binding for that player id.
    ///
    /// Re-identifying a connection first drops its previous binding. The
    /// connection that lost the slot (if a different one) has its identity
    /// cleared and is returned so the caller can strip its room
    /// memberships. It is not notified.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] if `conn_id` is not registered;
    /// the registry is left untouched.
    pub fn set_identity(
        &mut self,
        conn_id: ConnectionId,
        identity: Identity,
    ) -> Result<Option<ConnectionId>, SessionError> {
        if !self.connections.contains_key(&conn_id) {
            return Err(SessionError::UnknownConnection(conn_id));
        }

        self.release_bindings(conn_id);

        let previous = match identity.player_id() {
            None => self.host.replace(conn_id),
            Some(player_id) => self.players.insert(player_id, conn_id),
        };
        let displaced = previous.filter(|prev| *prev != conn_id);

        if let Some(stale) = displaced {
            if let Some(entry) = self.connections.get_mut(&stale) {
                *entry = None;
            }
            tracing::info!(
                %conn_id,
                %stale,
                role = %identity.role(),
                "identity rebound, previous connection displaced"
            );
        }

        self.connections.insert(conn_id, Some(identity));
        Ok(displaced)
    }

    /// Returns the identity of a joined connection.
    ///
    /// `None` when the connection is unknown or has not joined yet.
    pub fn lookup(&self, conn_id: ConnectionId) -> Option<&Identity> {
        self.connections.get(&conn_id).and_then(Option::as_ref)
    }

    /// Returns `true` if the connection is registered (joined or not).
    pub fn is_registered(&self, conn_id: ConnectionId) -> bool {
        self.connections.contains_key(&conn_id)
    }

    /// The connection holding the host role, if any.
    pub fn current_host(&self) -> Option<ConnectionId> {
        self.host
    }

    /// The connection bound to `player_id`, if any.
    pub fn player_connection(&self, player_id: PlayerId) -> Option<ConnectionId> {
        self.players.get(&player_id).copied()
    }

    /// Every registered connection, joined or not, in ascending order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.connections.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Player ids with a bound connection, in ascending order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self.players.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drops the host/player binding owned by `conn_id`, if it still owns
    /// one.
    fn release_bindings(&mut self, conn_id: ConnectionId) {
        if self.host == Some(conn_id) {
            self.host = None;
        }
        let owned = self
            .connections
            .get(&conn_id)
            .and_then(Option::as_ref)
            .and_then(Identity::player_id);
        if let Some(player_id) = owned {
            if self.players.get(&player_id) == Some(&conn_id) {
                self.players.remove(&player_id);
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
