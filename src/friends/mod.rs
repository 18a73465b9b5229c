//! Friend graph: requests, accept/reject, friend lists, notifications.
//!
//! Friendship is symmetric and stored as two rows, one per direction, so
//! "friends of X" is a plain indexed lookup. A request produces a persisted
//! notification for the receiver plus a live push to any of their handles.

pub mod db;
pub mod handlers;
