//! Database operations for chats and their membership.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::user::UserSummary;
use crate::models::Chat;

/// A chat as stored, before members and latest message are populated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatRow {
    pub id: Uuid,
    pub chat_name: String,
    pub is_group: bool,
    pub group_admin: Option<Uuid>,
    pub profile_pic: String,
    pub latest_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CHAT_COLUMNS: &str =
    "id, chat_name, is_group, group_admin, profile_pic, latest_message_id, created_at, updated_at";

/// Placeholder display name for 1:1 chats; clients render the other
/// member's name instead.
pub const DIRECT_CHAT_NAME: &str = "sender";

/// Normalized key identifying a 1:1 chat by its unordered user pair.
///
/// Both orderings of (a, b) produce the same key, and the unique index on
/// this column is what makes get-or-create race-safe.
pub fn direct_pair_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}

/// Check whether a user is a member of a chat.
pub async fn is_chat_member(
    pool: &PgPool,
    chat_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM chat_members WHERE chat_id = $1 AND user_id = $2",
    )
    .bind(chat_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

/// Fetch a chat row by id.
pub async fn get_chat(pool: &PgPool, chat_id: Uuid) -> Result<Option<ChatRow>, sqlx::Error> {
    sqlx::query_as::<_, ChatRow>(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"))
        .bind(chat_id)
        .fetch_optional(pool)
        .await
}

/// Member ids of a chat.
pub async fn member_ids(pool: &PgPool, chat_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query("SELECT user_id FROM chat_members WHERE chat_id = $1 ORDER BY user_id")
        .bind(chat_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|r| r.get("user_id")).collect())
}

/// Member summaries of a chat, for populated responses.
pub async fn members_of(pool: &PgPool, chat_id: Uuid) -> Result<Vec<UserSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.name, u.email, u.profile_pic
        FROM chat_members cm
        INNER JOIN users u ON u.id = cm.user_id
        WHERE cm.chat_id = $1
        ORDER BY u.name ASC
        "#,
    )
    .bind(chat_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            profile_pic: row.get("profile_pic"),
        })
        .collect())
}

/// Populate a chat row into the full API shape: members and latest message.
pub async fn populate(pool: &PgPool, row: ChatRow) -> Result<Chat, sqlx::Error> {
    let users = members_of(pool, row.id).await?;
    let latest_message = match row.latest_message_id {
        Some(message_id) => crate::messages::db::get_message(pool, message_id).await?,
        None => None,
    };

    Ok(Chat {
        id: row.id,
        chat_name: row.chat_name,
        is_group: row.is_group,
        users,
        group_admin: row.group_admin,
        latest_message,
        profile_pic: row.profile_pic,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Find the existing 1:1 chat for a pair, if any.
pub async fn find_direct_chat(
    pool: &PgPool,
    a: Uuid,
    b: Uuid,
) -> Result<Option<ChatRow>, sqlx::Error> {
    sqlx::query_as::<_, ChatRow>(&format!(
        "SELECT {CHAT_COLUMNS} FROM chats WHERE pair_key = $1"
    ))
    .bind(direct_pair_key(a, b))
    .fetch_optional(pool)
    .await
}

/// Create the 1:1 chat for a pair.
///
/// Safe under concurrent duplicate calls: a unique violation on the pair
/// key means the other participant won the race, and the existing chat is
/// returned instead. The conflict never surfaces to callers.
pub async fn create_direct_chat(pool: &PgPool, a: Uuid, b: Uuid) -> Result<ChatRow, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO chats (id, chat_name, is_group, pair_key, created_at, updated_at)
        VALUES ($1, $2, FALSE, $3, $4, $4)
        "#,
    )
    .bind(id)
    .bind(DIRECT_CHAT_NAME)
    .bind(direct_pair_key(a, b))
    .bind(now)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) => {
            let lost_race = e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false);
            if lost_race {
                tracing::debug!("1:1 chat race for pair ({a}, {b}), reusing existing");
                if let Some(existing) = find_direct_chat(pool, a, b).await? {
                    return Ok(existing);
                }
            }
            return Err(e);
        }
    }

    for user_id in [a, b] {
        sqlx::query(
            "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    }

    get_chat(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Create a group chat. The creator is expected to already be in `members`
/// and becomes the admin.
pub async fn create_group_chat(
    pool: &PgPool,
    name: &str,
    admin: Uuid,
    members: &[Uuid],
) -> Result<ChatRow, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO chats (id, chat_name, is_group, group_admin, created_at, updated_at)
        VALUES ($1, $2, TRUE, $3, $4, $4)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(admin)
    .bind(now)
    .execute(pool)
    .await?;

    for user_id in members {
        sqlx::query(
            "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    }

    get_chat(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Chats for a user, excluding ones they soft-deleted, most recent first.
pub async fn chats_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<ChatRow>, sqlx::Error> {
    sqlx::query_as::<_, ChatRow>(&format!(
        r#"
        SELECT {CHAT_COLUMNS}
        FROM chats c
        WHERE EXISTS (
            SELECT 1 FROM chat_members cm
            WHERE cm.chat_id = c.id AND cm.user_id = $1
        )
        AND NOT EXISTS (
            SELECT 1 FROM chat_hidden ch
            WHERE ch.chat_id = c.id AND ch.user_id = $1
        )
        ORDER BY c.updated_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Rename a chat.
pub async fn rename_chat(pool: &PgPool, chat_id: Uuid, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE chats SET chat_name = $1, updated_at = $2 WHERE id = $3")
        .bind(name)
        .bind(Utc::now())
        .bind(chat_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Update a group's name and/or picture; untouched fields keep their value.
pub async fn update_group_details(
    pool: &PgPool,
    chat_id: Uuid,
    name: Option<&str>,
    profile_pic: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE chats
        SET chat_name = COALESCE($1, chat_name),
            profile_pic = COALESCE($2, profile_pic),
            updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(name)
    .bind(profile_pic)
    .bind(Utc::now())
    .bind(chat_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace a chat's member set wholesale. The caller must pass the complete
/// authoritative set; members absent from it are removed.
pub async fn replace_members(
    pool: &PgPool,
    chat_id: Uuid,
    members: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM chat_members WHERE chat_id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;

    for user_id in members {
        sqlx::query(
            "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Add a member. Adding an existing member is a no-op.
pub async fn add_member(pool: &PgPool, chat_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(chat_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a member. Removing a non-member is a no-op.
pub async fn remove_member(pool: &PgPool, chat_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM chat_members WHERE chat_id = $1 AND user_id = $2")
        .bind(chat_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Set (or clear) the group admin.
pub async fn set_group_admin(
    pool: &PgPool,
    chat_id: Uuid,
    admin: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE chats SET group_admin = $1 WHERE id = $2")
        .bind(admin)
        .bind(chat_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Hide a chat for one viewer. Idempotent.
pub async fn hide_chat_for(pool: &PgPool, chat_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO chat_hidden (chat_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(chat_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Hard-delete a chat and everything under it.
///
/// Children go before the parent: the latest-message pointer is cleared,
/// then message hidden-sets, then messages, then membership and hidden
/// rows, then the chat itself. A crash mid-cascade leaves orphaned
/// messages (unreachable, harmless), never a chat pointing at deleted rows.
pub async fn delete_chat_cascade(pool: &PgPool, chat_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE chats SET latest_message_id = NULL WHERE id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;

    sqlx::query(
        "DELETE FROM message_hidden WHERE message_id IN (SELECT id FROM messages WHERE chat_id = $1)",
    )
    .bind(chat_id)
    .execute(pool)
    .await?;

    sqlx::query("DELETE FROM messages WHERE chat_id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM chat_members WHERE chat_id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM chat_hidden WHERE chat_id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pair_key_is_order_insensitive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(direct_pair_key(a, b), direct_pair_key(b, a));
    }

    #[test]
    fn pair_key_of_self_pair_is_stable() {
        let a = Uuid::new_v4();
        assert_eq!(direct_pair_key(a, a), format!("{a}:{a}"));
    }

    proptest! {
        #[test]
        fn pair_key_symmetric(a in any::<u128>(), b in any::<u128>()) {
            let a = Uuid::from_u128(a);
            let b = Uuid::from_u128(b);
            prop_assert_eq!(direct_pair_key(a, b), direct_pair_key(b, a));
        }

        #[test]
        fn distinct_pairs_get_distinct_keys(
            a in any::<u128>(),
            b in any::<u128>(),
            c in any::<u128>(),
        ) {
            let (a, b, c) = (Uuid::from_u128(a), Uuid::from_u128(b), Uuid::from_u128(c));
            prop_assume!(c != a && c != b);
            prop_assert_ne!(direct_pair_key(a, b), direct_pair_key(a, c));
        }
    }
}
