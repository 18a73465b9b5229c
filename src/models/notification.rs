use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored notification, currently only friend requests.
///
/// Notifications are persisted so a user who was offline when the request
/// arrived still sees it; live users additionally get a push on their
/// personal handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub const FRIEND_REQUEST: &'static str = "friend_request";
}
