//! Domain types shared across handlers and the realtime layer.
//!
//! These are the wire shapes the REST API and the socket protocol speak.
//! Database row types live next to the queries that produce them, in the
//! per-domain `db` modules.

pub mod chat;
pub mod message;
pub mod notification;
pub mod user;

pub use chat::Chat;
pub use message::{FileAttachment, Message};
pub use notification::Notification;
pub use user::UserSummary;
