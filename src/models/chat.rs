use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::message::Message;
use crate::models::user::UserSummary;

/// A conversation as served to clients, members and latest message populated.
///
/// 1:1 chats carry a placeholder name (clients render the other member's
/// name) and are unique per unordered user pair. Groups additionally carry
/// an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub chat_name: String,
    pub is_group: bool,
    pub users: Vec<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_admin: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<Message>,
    pub profile_pic: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
