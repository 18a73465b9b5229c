//! Connection registry: authenticated user -> live connection handles.
//!
//! A user may be bound to any number of handles at once (multiple tabs or
//! devices). The registry owns each connection's event sender; fan-out code
//! looks senders up here by connection id.
//!
//! All mutation happens under one coarse mutex that is never held across an
//! await, so bind/unbind are atomic with respect to each other.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::realtime::events::ServerEvent;

/// Opaque handle identifying one live transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Sending half of a connection's event queue. Unbounded: pushing an event
/// never blocks a handler, and a dead receiver just makes sends fail, which
/// fan-out ignores per-handle.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

struct Binding {
    user_id: Uuid,
    tx: EventSender,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, Binding>,
    by_user: HashMap<Uuid, HashSet<ConnectionId>>,
}

/// Process-wide map of authenticated users to live connections.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Allocate a fresh connection id. Ids are never reused within a process.
    pub fn allocate_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a connection under a user identity.
    ///
    /// Idempotent: binding the same handle twice (even to another user, as
    /// happens when a client re-sends `setup`) just overwrites the binding.
    pub fn bind(&self, user_id: Uuid, id: ConnectionId, tx: EventSender) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");

        if let Some(previous) = inner.connections.insert(id, Binding { user_id, tx }) {
            if previous.user_id != user_id {
                if let Some(set) = inner.by_user.get_mut(&previous.user_id) {
                    set.remove(&id);
                    if set.is_empty() {
                        inner.by_user.remove(&previous.user_id);
                    }
                }
            }
        }
        inner.by_user.entry(user_id).or_default().insert(id);

        tracing::debug!("bound {id} to user {user_id}");
    }

    /// Remove a handle from all user associations.
    ///
    /// Safe to call for a handle that was never bound; returns the user the
    /// handle was bound to, if any.
    pub fn unbind(&self, id: ConnectionId) -> Option<Uuid> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");

        let binding = inner.connections.remove(&id)?;
        if let Some(set) = inner.by_user.get_mut(&binding.user_id) {
            set.remove(&id);
            if set.is_empty() {
                inner.by_user.remove(&binding.user_id);
            }
        }

        tracing::debug!("unbound {id} from user {}", binding.user_id);
        Some(binding.user_id)
    }

    /// Live senders for a user, for personal (non-room) pushes. Empty when
    /// the user has no connection; callers treat absence as deliver-later.
    pub fn handles_for(&self, user_id: Uuid) -> Vec<(ConnectionId, EventSender)> {
        let inner = self.inner.lock().expect("registry lock poisoned");

        inner
            .by_user
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.connections.get(id).map(|b| (*id, b.tx.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The user a handle is bound to, if any.
    pub fn user_of(&self, id: ConnectionId) -> Option<Uuid> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.connections.get(&id).map(|b| b.user_id)
    }

    /// Sender for a specific handle, if still bound.
    pub fn sender_of(&self, id: ConnectionId) -> Option<EventSender> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.connections.get(&id).map(|b| b.tx.clone())
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
