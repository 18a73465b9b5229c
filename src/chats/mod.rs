//! Chat lifecycle: 1:1 access/create, group management, soft/hard deletion.
//!
//! 1:1 chats are unique per unordered user pair; the database enforces this
//! with a normalized pair key so concurrent creation from both participants
//! collapses onto one chat. Hard deletion cascades children before parent
//! and notifies the chat's room.

pub mod db;
pub mod handlers;
