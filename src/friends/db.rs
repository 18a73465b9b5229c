//! Database operations for the friend graph and notifications.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::notification::Notification;
use crate::models::user::UserSummary;

fn summaries(rows: Vec<sqlx::postgres::PgRow>) -> Vec<UserSummary> {
    rows.into_iter()
        .map(|row| UserSummary {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            profile_pic: row.get("profile_pic"),
        })
        .collect()
}

/// Whether a pending request from `sender` to `receiver` exists.
pub async fn has_pending_request(
    pool: &PgPool,
    sender: Uuid,
    receiver: Uuid,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM friend_requests WHERE sender_id = $1 AND receiver_id = $2",
    )
    .bind(sender)
    .bind(receiver)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i64, _>("count") > 0)
}

/// Whether two users are friends. Friendship rows are symmetric, so one
/// direction suffices.
pub async fn are_friends(pool: &PgPool, a: Uuid, b: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM friendships WHERE user_id = $1 AND friend_id = $2",
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i64, _>("count") > 0)
}

/// Record a friend request. Duplicate requests are no-ops.
pub async fn create_friend_request(
    pool: &PgPool,
    sender: Uuid,
    receiver: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO friend_requests (sender_id, receiver_id, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(sender)
    .bind(receiver)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop a pending request. Dropping an absent one is a no-op.
pub async fn delete_friend_request(
    pool: &PgPool,
    sender: Uuid,
    receiver: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM friend_requests WHERE sender_id = $1 AND receiver_id = $2")
        .bind(sender)
        .bind(receiver)
        .execute(pool)
        .await?;
    Ok(())
}

/// Make two users friends: one row per direction.
pub async fn create_friendship(pool: &PgPool, a: Uuid, b: Uuid) -> Result<(), sqlx::Error> {
    for (user, friend) in [(a, b), (b, a)] {
        sqlx::query(
            r#"
            INSERT INTO friendships (user_id, friend_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user)
        .bind(friend)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// A user's friends as sanitized summaries.
pub async fn friends_of(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.name, u.email, u.profile_pic
        FROM friendships f
        INNER JOIN users u ON u.id = f.friend_id
        WHERE f.user_id = $1
        ORDER BY u.name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(summaries(rows))
}

/// Users with a pending request towards `user_id`.
pub async fn pending_requests_for(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<UserSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.name, u.email, u.profile_pic
        FROM friend_requests fr
        INNER JOIN users u ON u.id = fr.sender_id
        WHERE fr.receiver_id = $1
        ORDER BY fr.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(summaries(rows))
}

/// Persist a notification for a receiver.
pub async fn create_notification(
    pool: &PgPool,
    kind: &str,
    sender: Uuid,
    receiver: Uuid,
) -> Result<Notification, sqlx::Error> {
    let notification = Notification {
        id: Uuid::new_v4(),
        kind: kind.to_string(),
        sender_id: sender,
        receiver_id: receiver,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO notifications (id, kind, sender_id, receiver_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(notification.id)
    .bind(&notification.kind)
    .bind(notification.sender_id)
    .bind(notification.receiver_id)
    .bind(notification.created_at)
    .execute(pool)
    .await?;

    Ok(notification)
}

/// Remove the notifications a request produced, once it is resolved.
pub async fn delete_request_notifications(
    pool: &PgPool,
    sender: Uuid,
    receiver: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM notifications WHERE kind = $1 AND sender_id = $2 AND receiver_id = $3",
    )
    .bind(Notification::FRIEND_REQUEST)
    .bind(sender)
    .bind(receiver)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove one notification, scoped to its receiver. Returns whether a row
/// was actually deleted; a wrong id or someone else's notification deletes
/// nothing.
pub async fn delete_notification(
    pool: &PgPool,
    notification_id: Uuid,
    receiver: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND receiver_id = $2")
        .bind(notification_id)
        .bind(receiver)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// A receiver's notifications, newest first.
pub async fn notifications_for(
    pool: &PgPool,
    receiver: Uuid,
) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, kind, sender_id, receiver_id, created_at
        FROM notifications
        WHERE receiver_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(receiver)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Notification {
            id: row.get("id"),
            kind: row.get("kind"),
            sender_id: row.get("sender_id"),
            receiver_id: row.get("receiver_id"),
            created_at: row.get("created_at"),
        })
        .collect())
}
