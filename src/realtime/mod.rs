//! Real-time delivery: connection registry, room membership and the
//! WebSocket gateway.
//!
//! # Architecture
//!
//! - **`registry`** - maps authenticated users to live connection handles
//! - **`rooms`** - maps chat ids to the connections currently joined
//! - **`events`** - the JSON wire protocol, both directions
//! - **`gateway`** - relays client events and fans out server events
//! - **`socket`** - the axum WebSocket endpoint feeding the gateway
//!
//! Registry and rooms are process-wide in-memory state: initialized empty at
//! startup, gone at shutdown, never persisted. Both are guarded by a single
//! coarse mutex each and never held across an await, so a join/leave is
//! atomic with respect to concurrent joins/leaves from other connections.
//!
//! Delivery ordering: callers persist to the store first and fan out after.
//! Fan-out is best-effort; a client that suspects a missed event reconciles
//! by re-fetching history.

pub mod events;
pub mod gateway;
pub mod registry;
pub mod rooms;
pub mod socket;

pub use events::{ClientEvent, ServerEvent};
pub use gateway::RealtimeGateway;
pub use registry::{ConnectionId, ConnectionRegistry};
pub use rooms::RoomMembership;
