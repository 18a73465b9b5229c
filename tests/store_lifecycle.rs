//! Store-backed lifecycle properties, run through the real handlers against
//! a per-test PostgreSQL database (`#[sqlx::test]` provisions it and applies
//! the migrations). No socket is attached anywhere, so fan-out is a no-op
//! and these tests observe the persisted state only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;
use uuid::Uuid;

use palaver::auth::users::{create_user, User};
use palaver::chats::handlers::{
    access_chat, create_group, leave_group, AccessChatRequest, CreateGroupRequest,
};
use palaver::friends::handlers::{delete_notification, send_request, SendRequestBody};
use palaver::messages::handlers::{
    delete_message, fetch_messages, send_message, soft_delete_message, SendMessageRequest,
};
use palaver::middleware::auth::{AuthUser, AuthenticatedUser};
use palaver::models::Message;
use palaver::server::state::AppState;

async fn user(pool: &PgPool, name: &str) -> User {
    create_user(pool, name, &format!("{name}@example.com"), "not-a-real-hash")
        .await
        .expect("create user")
}

fn as_user(user: &User) -> AuthUser {
    AuthUser(AuthenticatedUser {
        user_id: user.id,
        email: user.email.clone(),
    })
}

async fn send_text(state: &AppState, sender: &User, chat_id: Uuid, content: &str) -> Message {
    let Json(message) = send_message(
        State(state.clone()),
        as_user(sender),
        Json(SendMessageRequest {
            chat_id,
            content: content.to_string(),
            file: None,
        }),
    )
    .await
    .expect("send message");
    message
}

#[sqlx::test]
async fn direct_chat_access_is_idempotent_per_pair(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let Json(first) = access_chat(
        State(state.clone()),
        as_user(&alice),
        Json(AccessChatRequest {
            target_user_id: bob.id,
        }),
    )
    .await
    .expect("first access");

    // Reversed direction must land on the same chat.
    let Json(second) = access_chat(
        State(state.clone()),
        as_user(&bob),
        Json(AccessChatRequest {
            target_user_id: alice.id,
        }),
    )
    .await
    .expect("second access");

    assert_eq!(first.id, second.id);
    assert!(!second.is_group);
    assert_eq!(second.users.len(), 2);
}

#[sqlx::test]
async fn send_updates_history_and_latest_pointer(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let Json(chat) = access_chat(
        State(state.clone()),
        as_user(&alice),
        Json(AccessChatRequest {
            target_user_id: bob.id,
        }),
    )
    .await
    .expect("access chat");

    let message = send_text(&state, &alice, chat.id, "hello bob").await;

    // Any member's history contains the message.
    let Json(history) = fetch_messages(State(state.clone()), as_user(&bob), Path(chat.id))
        .await
        .expect("history");
    assert!(history.iter().any(|m| m.id == message.id));

    let row = palaver::chats::db::get_chat(&pool, chat.id)
        .await
        .expect("chat lookup")
        .expect("chat exists");
    assert_eq!(row.latest_message_id, Some(message.id));
}

#[sqlx::test]
async fn hard_delete_recomputes_latest_pointer(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let Json(chat) = access_chat(
        State(state.clone()),
        as_user(&alice),
        Json(AccessChatRequest {
            target_user_id: bob.id,
        }),
    )
    .await
    .expect("access chat");

    let first = send_text(&state, &alice, chat.id, "first").await;
    let second = send_text(&state, &alice, chat.id, "second").await;

    // Deleting the newest message moves the pointer to the survivor.
    let status = delete_message(State(state.clone()), as_user(&alice), Path(second.id))
        .await
        .expect("delete newest");
    assert_eq!(status, StatusCode::OK);

    let row = palaver::chats::db::get_chat(&pool, chat.id)
        .await
        .expect("chat lookup")
        .expect("chat exists");
    assert_eq!(row.latest_message_id, Some(first.id));

    // Deleting the last one leaves no pointer at all.
    delete_message(State(state.clone()), as_user(&alice), Path(first.id))
        .await
        .expect("delete last");
    let row = palaver::chats::db::get_chat(&pool, chat.id)
        .await
        .expect("chat lookup")
        .expect("chat exists");
    assert_eq!(row.latest_message_id, None);

    let Json(history) = fetch_messages(State(state.clone()), as_user(&bob), Path(chat.id))
        .await
        .expect("history");
    assert!(history.is_empty());
}

#[sqlx::test]
async fn only_the_sender_may_hard_delete(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let Json(chat) = access_chat(
        State(state.clone()),
        as_user(&alice),
        Json(AccessChatRequest {
            target_user_id: bob.id,
        }),
    )
    .await
    .expect("access chat");
    let message = send_text(&state, &alice, chat.id, "mine").await;

    let error = delete_message(State(state.clone()), as_user(&bob), Path(message.id))
        .await
        .expect_err("non-sender delete must fail");
    assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
}

#[sqlx::test]
async fn soft_delete_hides_only_for_the_hiding_user(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let Json(chat) = access_chat(
        State(state.clone()),
        as_user(&alice),
        Json(AccessChatRequest {
            target_user_id: bob.id,
        }),
    )
    .await
    .expect("access chat");
    let message = send_text(&state, &alice, chat.id, "now you see me").await;

    // Twice: soft delete is idempotent.
    for _ in 0..2 {
        let status = soft_delete_message(State(state.clone()), as_user(&bob), Path(message.id))
            .await
            .expect("soft delete");
        assert_eq!(status, StatusCode::OK);
    }

    let Json(bob_history) = fetch_messages(State(state.clone()), as_user(&bob), Path(chat.id))
        .await
        .expect("bob history");
    assert!(bob_history.is_empty());

    let Json(alice_history) = fetch_messages(State(state.clone()), as_user(&alice), Path(chat.id))
        .await
        .expect("alice history");
    assert_eq!(alice_history.len(), 1);
}

#[sqlx::test]
async fn admin_leave_hands_role_to_first_remaining_member(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let carol = user(&pool, "carol").await;

    let Json(group) = create_group(
        State(state.clone()),
        as_user(&alice),
        Json(CreateGroupRequest {
            name: "weekend plans".to_string(),
            member_ids: vec![bob.id, carol.id],
        }),
    )
    .await
    .expect("create group");
    assert_eq!(group.group_admin, Some(alice.id));

    let Json(after) = leave_group(State(state.clone()), as_user(&alice), Path(group.id))
        .await
        .expect("admin leaves");

    // Handover is deterministic: the first remaining member by id.
    let expected = bob.id.min(carol.id);
    assert_eq!(after.group_admin, Some(expected));
    assert_eq!(after.users.len(), 2);
    assert!(!after.users.iter().any(|u| u.id == alice.id));
}

#[sqlx::test]
async fn group_create_rejects_unknown_member(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let error = create_group(
        State(state.clone()),
        as_user(&alice),
        Json(CreateGroupRequest {
            name: "ghost group".to_string(),
            member_ids: vec![bob.id, Uuid::new_v4()],
        }),
    )
    .await
    .expect_err("unknown member must be rejected");
    assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn receiver_dismisses_own_notification_and_nobody_elses(pool: PgPool) {
    let state = AppState::new(pool.clone());
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    send_request(
        State(state.clone()),
        as_user(&alice),
        Json(SendRequestBody {
            target_user_id: bob.id,
        }),
    )
    .await
    .expect("friend request");

    let notifications = palaver::friends::db::notifications_for(&pool, bob.id)
        .await
        .expect("notifications");
    assert_eq!(notifications.len(), 1);
    let notification_id = notifications[0].id;

    // The sender cannot dismiss the receiver's notification.
    let error = delete_notification(State(state.clone()), as_user(&alice), Path(notification_id))
        .await
        .expect_err("foreign dismiss must fail");
    assert_eq!(error.status_code(), StatusCode::NOT_FOUND);

    let status = delete_notification(State(state.clone()), as_user(&bob), Path(notification_id))
        .await
        .expect("own dismiss");
    assert_eq!(status, StatusCode::OK);

    let remaining = palaver::friends::db::notifications_for(&pool, bob.id)
        .await
        .expect("notifications");
    assert!(remaining.is_empty());
}
