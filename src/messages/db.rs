//! Database operations for messages.

use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::models::message::{FileAttachment, Message};
use crate::models::user::UserSummary;

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.chat_id, m.content,
           m.file_url, m.file_name, m.file_mime,
           m.created_at,
           u.id AS sender_id, u.name AS sender_name,
           u.email AS sender_email, u.profile_pic AS sender_profile_pic
    FROM messages m
    INNER JOIN users u ON u.id = m.sender_id
"#;

fn message_from_row(row: PgRow) -> Message {
    let file = match (row.get::<Option<String>, _>("file_url"),) {
        (Some(url),) => Some(FileAttachment {
            url,
            name: row
                .get::<Option<String>, _>("file_name")
                .unwrap_or_default(),
            mime_type: row
                .get::<Option<String>, _>("file_mime")
                .unwrap_or_default(),
        }),
        (None,) => None,
    };

    Message {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        sender: UserSummary {
            id: row.get("sender_id"),
            name: row.get("sender_name"),
            email: row.get("sender_email"),
            profile_pic: row.get("sender_profile_pic"),
        },
        content: row.get("content"),
        file,
        created_at: row.get("created_at"),
    }
}

/// Fetch one message with its sender populated.
pub async fn get_message(pool: &PgPool, message_id: Uuid) -> Result<Option<Message>, sqlx::Error> {
    let row = sqlx::query(&format!("{MESSAGE_SELECT} WHERE m.id = $1"))
        .bind(message_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(message_from_row))
}

/// Persist a message and advance the chat's latest-message pointer.
///
/// The chat's `updated_at` is bumped too, which is what keeps the inbox
/// sorted by recency.
pub async fn insert_message(
    pool: &PgPool,
    chat_id: Uuid,
    sender_id: Uuid,
    content: &str,
    file: Option<&FileAttachment>,
) -> Result<Message, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO messages (id, chat_id, sender_id, content, file_url, file_name, file_mime, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(chat_id)
    .bind(sender_id)
    .bind(content)
    .bind(file.map(|f| f.url.as_str()))
    .bind(file.map(|f| f.name.as_str()))
    .bind(file.map(|f| f.mime_type.as_str()))
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE chats SET latest_message_id = $1, updated_at = $2 WHERE id = $3")
        .bind(id)
        .bind(now)
        .bind(chat_id)
        .execute(pool)
        .await?;

    get_message(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// History for a chat as seen by one viewer: messages the viewer has
/// soft-deleted are excluded, creation order ascending.
pub async fn messages_for_chat(
    pool: &PgPool,
    chat_id: Uuid,
    viewer: Uuid,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        {MESSAGE_SELECT}
        WHERE m.chat_id = $1
        AND NOT EXISTS (
            SELECT 1 FROM message_hidden mh
            WHERE mh.message_id = m.id AND mh.user_id = $2
        )
        ORDER BY m.created_at ASC
        "#
    ))
    .bind(chat_id)
    .bind(viewer)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(message_from_row).collect())
}

/// Hide a message for one viewer. Idempotent; affects only that viewer's
/// future fetches.
pub async fn hide_message_for(
    pool: &PgPool,
    message_id: Uuid,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO message_hidden (message_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(message_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a message entirely and recompute the parent chat's latest-message
/// pointer from the most recent surviving message (NULL when none remain).
pub async fn delete_message(
    pool: &PgPool,
    message_id: Uuid,
    chat_id: Uuid,
) -> Result<(), sqlx::Error> {
    // The pointer references the row, so clear it before the delete.
    sqlx::query("UPDATE chats SET latest_message_id = NULL WHERE latest_message_id = $1")
        .bind(message_id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM message_hidden WHERE message_id = $1")
        .bind(message_id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(message_id)
        .execute(pool)
        .await?;

    let survivor = sqlx::query(
        "SELECT id FROM messages WHERE chat_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await?;

    sqlx::query("UPDATE chats SET latest_message_id = $1 WHERE id = $2")
        .bind(survivor.map(|row| row.get::<Uuid, _>("id")))
        .bind(chat_id)
        .execute(pool)
        .await?;

    Ok(())
}
