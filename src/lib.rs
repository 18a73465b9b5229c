//! Palaver - a real-time chat backend.
//!
//! An Axum HTTP server backed by PostgreSQL, pairing a conventional REST
//! surface (accounts, friends, chats, messages) with a WebSocket realtime
//! layer for message push, typing indicators, and deletion notifications.
//!
//! # Module Structure
//!
//! - **`models`** - wire types shared by the REST and realtime surfaces
//! - **`auth`** - signup/login, JWT sessions, user lookups
//! - **`friends`** - friend requests, friendships, notifications
//! - **`chats`** - 1:1 and group chat lifecycle
//! - **`messages`** - message send, history, soft/hard deletion
//! - **`realtime`** - connection registry, room membership, the gateway,
//!   and the WebSocket endpoint
//! - **`routes`** / **`server`** - router assembly and startup
//!
//! # Delivery Model
//!
//! The store is the source of truth. Every realtime push happens after the
//! corresponding row is persisted, so a client that misses a push (offline,
//! not joined to the room) still converges by refetching. Typing indicators
//! are the one exception: ephemeral, never persisted, best-effort.

pub mod auth;
pub mod chats;
pub mod error;
pub mod friends;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod server;
