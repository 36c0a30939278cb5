//! Room membership: a many-to-many relation between rooms and connections.

use std::collections::{HashMap, HashSet};

use tavern_protocol::RoomName;
use tavern_transport::ConnectionId;

/// Groups connections into named rooms.
///
/// Rooms are created on first join and never removed; an empty room simply
/// has no members. A connection can sit in several rooms at once (a player
/// is in its private room and in `all_players`).
///
/// Like the registry, this has no internal locking: the router keeps it
/// behind the same mutex.
#[derive(Debug, Default)]
pub struct MembershipManager {
    /// Members of every room ever joined.
    rooms: HashMap<RoomName, HashSet<ConnectionId>>,

    /// Reverse index so `leave_all` does not scan every room.
    /// Kept in sync with `rooms`.
    memberships: HashMap<ConnectionId, HashSet<RoomName>>,
}

impl MembershipManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room, creating the room if needed.
    ///
    /// Idempotent. Returns `true` if the connection was not a member yet.
    pub fn join(&mut self, room: RoomName, conn_id: ConnectionId) -> bool {
        let added = self.rooms.entry(room).or_default().insert(conn_id);
        if added {
            self.memberships.entry(conn_id).or_default().insert(room);
            tracing::debug!(%conn_id, %room, "joined room");
        }
        added
    }

    /// Removes a connection from a room. No error if it was not a member.
    ///
    /// Returns `true` if a membership was removed.
    pub fn leave(&mut self, room: RoomName, conn_id: ConnectionId) -> bool {
        let removed = self
            .rooms
            .get_mut(&room)
            .is_some_and(|members| members.remove(&conn_id));
        if removed {
            if let Some(rooms) = self.memberships.get_mut(&conn_id) {
                rooms.remove(&room);
                if rooms.is_empty() {
                    self.memberships.remove(&conn_id);
                }
            }
            tracing::debug!(%conn_id, %room, "left room");
        }
        removed
    }

    /// Removes a connection from every room it belongs to.
    ///
    /// Returns the rooms it left, sorted.
    pub fn leave_all(&mut self, conn_id: ConnectionId) -> Vec<RoomName> {
        let mut left: Vec<RoomName> = self
            .memberships
            .remove(&conn_id)
            .map(|rooms| rooms.into_iter().collect())
            .unwrap_or_default();
        for room in &left {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(&conn_id);
            }
        }
        left.sort();
        left
    }

    /// Members of a room. Unknown rooms are simply empty.
    pub fn members(&self, room: RoomName) -> HashSet<ConnectionId> {
        self.rooms.get(&room).cloned().unwrap_or_default()
    }

    /// Returns `true` if `conn_id` is in `room`.
    pub fn contains(&self, room: RoomName, conn_id: ConnectionId) -> bool {
        self.rooms
            .get(&room)
            .is_some_and(|members| members.contains(&conn_id))
    }

    /// The rooms a connection belongs to, sorted.
    pub fn rooms_of(&self, conn_id: ConnectionId) -> Vec<RoomName> {
        let mut rooms: Vec<RoomName> = self
            .memberships
            .get(&conn_id)
            .map(|rooms| rooms.iter().copied().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Number of rooms ever created, including empty ones.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavern_protocol::PlayerId;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn player_room(id: u64) -> RoomName {
        RoomName::Player(PlayerId(id))
    }

    #[test]
    fn test_join_twice_keeps_single_membership() {
        let mut rooms = MembershipManager::new();
        assert!(rooms.join(RoomName::Host, cid(1)));
        assert!(!rooms.join(RoomName::Host, cid(1)));

        let members = rooms.members(RoomName::Host);
        assert_eq!(members.len(), 1);
        assert!(members.contains(&cid(1)));
    }

    #[test]
    fn test_members_of_unknown_room_is_empty() {
        let rooms = MembershipManager::new();
        assert!(rooms.members(player_room(42)).is_empty());
    }

    #[test]
    fn test_leave_absent_is_noop() {
        let mut rooms = MembershipManager::new();
        assert!(!rooms.leave(RoomName::AllPlayers, cid(1)));
        rooms.join(RoomName::AllPlayers, cid(2));
        assert!(!rooms.leave(RoomName::AllPlayers, cid(1)));
        assert_eq!(rooms.members(RoomName::AllPlayers).len(), 1);
    }

    #[test]
    fn test_leave_keeps_empty_room() {
        let mut rooms = MembershipManager::new();
        rooms.join(player_room(3), cid(1));
        assert!(rooms.leave(player_room(3), cid(1)));
        assert!(rooms.members(player_room(3)).is_empty());
        assert_eq!(rooms.room_count(), 1);
        assert!(rooms.rooms_of(cid(1)).is_empty());
    }

    #[test]
    fn test_leave_all_removes_every_membership() {
        let mut rooms = MembershipManager::new();
        rooms.join(player_room(3), cid(1));
        rooms.join(RoomName::AllPlayers, cid(1));
        rooms.join(RoomName::AllPlayers, cid(2));

        let left = rooms.leave_all(cid(1));

        assert_eq!(left, vec![RoomName::AllPlayers, player_room(3)]);
        assert!(!rooms.contains(player_room(3), cid(1)));
        assert!(!rooms.contains(RoomName::AllPlayers, cid(1)));
        assert!(rooms.contains(RoomName::AllPlayers, cid(2)));
    }

    #[test]
    fn test_leave_all_unknown_connection_is_noop() {
        let mut rooms = MembershipManager::new();
        rooms.join(RoomName::Host, cid(1));
        assert!(rooms.leave_all(cid(9)).is_empty());
        assert!(rooms.contains(RoomName::Host, cid(1)));
    }

    #[test]
    fn test_rooms_of_lists_all_rooms_sorted() {
        let mut rooms = MembershipManager::new();
        rooms.join(RoomName::AllPlayers, cid(1));
        rooms.join(player_room(4), cid(1));
        assert_eq!(
            rooms.rooms_of(cid(1)),
            vec![RoomName::AllPlayers, player_room(4)]
        );
    }
}
