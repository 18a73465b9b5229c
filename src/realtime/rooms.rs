//! Room membership: chat id -> connections currently joined.
//!
//! Membership is connection-scoped, not user-scoped, so closing one tab
//! never evicts a user's other tabs from a room; each tab joins rooms
//! independently as it loads a chat's history.
//!
//! This layer performs no authorization. The gateway verifies that the
//! connection's user is actually a chat member before calling [`join`];
//! rejecting unauthorized joins is the gateway's job, not this one's.
//!
//! [`join`]: RoomMembership::join

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use crate::realtime::registry::ConnectionId;

#[derive(Default)]
struct Inner {
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
    // Reverse index so leave_all does not scan every room.
    by_connection: HashMap<ConnectionId, HashSet<Uuid>>,
}

/// Process-wide map of chat rooms to joined connections.
pub struct RoomMembership {
    inner: Mutex<Inner>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Add a handle to a room's member set. Idempotent; a connection may
    /// join any number of rooms.
    pub fn join(&self, id: ConnectionId, chat_id: Uuid) {
        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        inner.rooms.entry(chat_id).or_default().insert(id);
        inner.by_connection.entry(id).or_default().insert(chat_id);
        tracing::debug!("{id} joined room {chat_id}");
    }

    /// Remove a handle from one room. Leaving a room never joined is a no-op.
    pub fn leave(&self, id: ConnectionId, chat_id: Uuid) {
        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        if let Some(members) = inner.rooms.get_mut(&chat_id) {
            members.remove(&id);
            if members.is_empty() {
                inner.rooms.remove(&chat_id);
            }
        }
        if let Some(joined) = inner.by_connection.get_mut(&id) {
            joined.remove(&chat_id);
            if joined.is_empty() {
                inner.by_connection.remove(&id);
            }
        }
    }

    /// Drop all memberships for a handle. Invoked on disconnect.
    pub fn leave_all(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        let Some(joined) = inner.by_connection.remove(&id) else {
            return;
        };
        for chat_id in joined {
            if let Some(members) = inner.rooms.get_mut(&chat_id) {
                members.remove(&id);
                if members.is_empty() {
                    inner.rooms.remove(&chat_id);
                }
            }
        }
        tracing::debug!("{id} left all rooms");
    }

    /// Connections currently joined to a room. Empty when nobody is joined,
    /// making fan-out a no-op rather than an error.
    pub fn members_of(&self, chat_id: Uuid) -> Vec<ConnectionId> {
        let inner = self.inner.lock().expect("rooms lock poisoned");
        inner
            .rooms
            .get(&chat_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for RoomMembership {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<ConnectionId> {
        let registry = crate::realtime::registry::ConnectionRegistry::new();
        (0..n).map(|_| registry.allocate_id()).collect()
    }

    #[test]
    fn join_is_idempotent() {
        let rooms = RoomMembership::new();
        let chat = Uuid::new_v4();
        let conn = ids(1)[0];

        rooms.join(conn, chat);
        rooms.join(conn, chat);

        assert_eq!(rooms.members_of(chat), vec![conn]);
    }

    #[test]
    fn connection_may_join_many_rooms() {
        let rooms = RoomMembership::new();
        let conn = ids(1)[0];
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        rooms.join(conn, a);
        rooms.join(conn, b);

        assert_eq!(rooms.members_of(a), vec![conn]);
        assert_eq!(rooms.members_of(b), vec![conn]);
    }

    #[test]
    fn leave_unknown_room_is_noop() {
        let rooms = RoomMembership::new();
        let conn = ids(1)[0];
        rooms.leave(conn, Uuid::new_v4());
        rooms.leave_all(conn);
    }

    #[test]
    fn leave_all_clears_every_membership() {
        let rooms = RoomMembership::new();
        let all = ids(2);
        let (conn, other) = (all[0], all[1]);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        rooms.join(conn, a);
        rooms.join(conn, b);
        rooms.join(other, a);
        rooms.leave_all(conn);

        assert_eq!(rooms.members_of(a), vec![other]);
        assert!(rooms.members_of(b).is_empty());
    }

    #[test]
    fn one_tab_leaving_keeps_the_other_joined() {
        let rooms = RoomMembership::new();
        let tabs = ids(2);
        let chat = Uuid::new_v4();

        rooms.join(tabs[0], chat);
        rooms.join(tabs[1], chat);
        rooms.leave_all(tabs[0]);

        assert_eq!(rooms.members_of(chat), vec![tabs[1]]);
    }

    #[test]
    fn members_of_empty_room_is_empty() {
        let rooms = RoomMembership::new();
        assert!(rooms.members_of(Uuid::new_v4()).is_empty());
    }
}
