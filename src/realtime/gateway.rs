//! The transport-facing coordinator for the realtime layer.
//!
//! One gateway is constructed at startup and handed to the HTTP handlers
//! through `AppState` - the write path calls [`RealtimeGateway::broadcast_to_room`]
//! after a successful persist, never before.
//!
//! Client-originated events are handled here: `setup` binds an identity
//! (verified from the same JWT the HTTP channel uses), `join chat` is
//! authorized against chat membership in the store, typing events are
//! relayed to the rest of the room. Anything malformed or unauthorized is
//! logged and dropped; a misbehaving event never tears down the connection
//! or affects other connections.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::sessions::user_id_from_token;
use crate::realtime::events::{ClientEvent, ServerEvent};
use crate::realtime::registry::{ConnectionId, ConnectionRegistry, EventSender};
use crate::realtime::rooms::RoomMembership;

pub struct RealtimeGateway {
    registry: ConnectionRegistry,
    rooms: RoomMembership,
    pool: PgPool,
}

impl RealtimeGateway {
    pub fn new(pool: PgPool) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomMembership::new(),
            pool,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomMembership {
        &self.rooms
    }

    /// Allocate an id for a freshly accepted transport connection. The
    /// connection is not in the registry until its `setup` event arrives.
    pub fn open_connection(&self) -> ConnectionId {
        self.registry.allocate_id()
    }

    /// Handle one client-originated event.
    pub async fn handle_event(&self, id: ConnectionId, tx: &EventSender, event: ClientEvent) {
        match event {
            ClientEvent::Setup { token } => match user_id_from_token(&token) {
                Ok(user_id) => {
                    self.registry.bind(user_id, id, tx.clone());
                    let _ = tx.send(ServerEvent::Connected);
                    tracing::info!("{id} authenticated as user {user_id}");
                }
                Err(reason) => {
                    tracing::warn!("{id} setup rejected: {reason}");
                }
            },
            ClientEvent::JoinChat { chat_id } => self.join_chat(id, chat_id).await,
            ClientEvent::Typing { chat_id } => {
                self.relay_typing(id, chat_id, ServerEvent::Typing { chat_id })
            }
            ClientEvent::StopTyping { chat_id } => {
                self.relay_typing(id, chat_id, ServerEvent::StopTyping { chat_id })
            }
        }
    }

    /// Authorize and perform a room join. Membership is checked against the
    /// store here, at the boundary; the room manager itself stays unchecked.
    async fn join_chat(&self, id: ConnectionId, chat_id: Uuid) {
        let Some(user_id) = self.registry.user_of(id) else {
            tracing::warn!("{id} tried to join {chat_id} before setup, dropped");
            return;
        };

        match crate::chats::db::is_chat_member(&self.pool, chat_id, user_id).await {
            Ok(true) => self.join_room(id, chat_id),
            Ok(false) => {
                tracing::warn!("user {user_id} is not a member of {chat_id}, join dropped");
            }
            Err(e) => {
                tracing::error!("membership lookup for {chat_id} failed: {e}, join dropped");
            }
        }
    }

    /// Unchecked join, exposed for callers that have already authorized.
    pub fn join_room(&self, id: ConnectionId, chat_id: Uuid) {
        self.rooms.join(id, chat_id);
    }

    /// Tear down a connection: all room memberships first, then the binding.
    pub fn disconnect(&self, id: ConnectionId) {
        self.rooms.leave_all(id);
        self.registry.unbind(id);
        tracing::debug!("{id} disconnected");
    }

    /// Relay a typing indicator to the other members of a room.
    ///
    /// Exclusion is by user, not by connection: none of the sender's own
    /// handles sees their typing echo, every other joined handle does.
    /// Purely ephemeral - nothing is persisted and delivery is best-effort.
    fn relay_typing(&self, id: ConnectionId, chat_id: Uuid, event: ServerEvent) {
        let Some(sender_user) = self.registry.user_of(id) else {
            tracing::debug!("{id} sent typing before setup, dropped");
            return;
        };

        for member in self.rooms.members_of(chat_id) {
            if self.registry.user_of(member) == Some(sender_user) {
                continue;
            }
            if let Some(tx) = self.registry.sender_of(member) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Fan out a server event to every connection joined to a room.
    ///
    /// No exclusion: the originator's own connections receive their echo
    /// (clients merge by message id). A dead handle is skipped; one stale
    /// connection never blocks delivery to the rest of the room.
    pub fn broadcast_to_room(&self, chat_id: Uuid, event: ServerEvent) -> usize {
        let members = self.rooms.members_of(chat_id);
        let mut delivered = 0;

        for member in &members {
            let Some(tx) = self.registry.sender_of(*member) else {
                continue;
            };
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(
            "fan-out to room {chat_id}: {delivered}/{} handles",
            members.len()
        );
        delivered
    }

    /// Push a personal event to all of a user's live handles. A user with no
    /// live connection simply receives nothing now; the persisted record is
    /// what they see on next fetch.
    pub fn notify_user(&self, user_id: Uuid, event: ServerEvent) -> usize {
        let handles = self.registry.handles_for(user_id);
        let mut delivered = 0;

        for (_, tx) in handles {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        delivered
    }
}
