//! HTTP handlers for the chat lifecycle.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::chats::db;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::models::Chat;
use crate::realtime::events::ServerEvent;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessChatRequest {
    pub target_user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub chat_id: Uuid,
    pub chat_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub users: Option<Vec<Uuid>>,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberRequest {
    pub chat_id: Uuid,
    pub user_id: Uuid,
}

async fn require_group(pool: &sqlx::PgPool, chat_id: Uuid) -> Result<db::ChatRow, ApiError> {
    let chat = db::get_chat(pool, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    if !chat.is_group {
        return Err(ApiError::validation("Not a group chat"));
    }
    Ok(chat)
}

/// `POST /chats` - get-or-create the 1:1 chat with another user.
///
/// Returns the existing chat when the pair already has one, in either
/// direction; concurrent first-creates from both sides collapse onto a
/// single chat.
pub async fn access_chat(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(request): Json<AccessChatRequest>,
) -> Result<Json<Chat>, ApiError> {
    if request.target_user_id == auth.user_id {
        return Err(ApiError::validation("Cannot start a chat with yourself"));
    }

    let other = crate::auth::users::get_user_by_id(&state.pool, request.target_user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let row = match db::find_direct_chat(&state.pool, auth.user_id, other.id).await? {
        Some(existing) => existing,
        None => {
            tracing::info!(
                "creating 1:1 chat between {} and {}",
                auth.user_id,
                other.id
            );
            db::create_direct_chat(&state.pool, auth.user_id, other.id).await?
        }
    };

    let chat = db::populate(&state.pool, row).await?;
    Ok(Json(chat))
}

/// `GET /chats` - the caller's chats, most recently active first. Chats the
/// caller soft-deleted are excluded.
pub async fn fetch_chats(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
) -> Result<Json<Vec<Chat>>, ApiError> {
    let rows = db::chats_for_user(&state.pool, auth.user_id).await?;

    let mut chats = Vec::with_capacity(rows.len());
    for row in rows {
        chats.push(db::populate(&state.pool, row).await?);
    }

    Ok(Json(chats))
}

/// `POST /chats/group` - create a group chat. The creator is added as a
/// member automatically and becomes the admin.
pub async fn create_group(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(request): Json<CreateGroupRequest>,
) -> Result<Json<Chat>, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Please fill all the fields"));
    }

    let mut seen = std::collections::HashSet::new();
    let mut members: Vec<Uuid> = request
        .member_ids
        .into_iter()
        .filter(|id| *id != auth.user_id && seen.insert(*id))
        .collect();
    if members.len() < 2 {
        return Err(ApiError::validation(
            "Group should have at least 3 people including you",
        ));
    }
    for member in &members {
        crate::auth::users::get_user_by_id(&state.pool, *member)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
    }
    members.push(auth.user_id);

    let row =
        db::create_group_chat(&state.pool, request.name.trim(), auth.user_id, &members).await?;
    tracing::info!("group {} created by {}", row.id, auth.user_id);

    let chat = db::populate(&state.pool, row).await?;
    Ok(Json(chat))
}

/// `PUT /chats/rename` - rename a chat. Any member may rename.
pub async fn rename_group(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(request): Json<RenameRequest>,
) -> Result<Json<Chat>, ApiError> {
    if request.chat_name.trim().is_empty() {
        return Err(ApiError::validation("Chat name is required"));
    }

    db::get_chat(&state.pool, request.chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    if !db::is_chat_member(&state.pool, request.chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    db::rename_chat(&state.pool, request.chat_id, request.chat_name.trim()).await?;

    let row = db::get_chat(&state.pool, request.chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    Ok(Json(db::populate(&state.pool, row).await?))
}

/// `PUT /chats/group/{chat_id}` - combined group update: name, member set,
/// picture, any subset of the three.
///
/// The `users` field, when present, is the complete authoritative member
/// set and overwrites the current one. If the overwrite removes the current
/// admin, the admin role moves to the first member of the new set.
pub async fn update_group(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(chat_id): Path<Uuid>,
    Json(request): Json<UpdateGroupRequest>,
) -> Result<Json<Chat>, ApiError> {
    let chat = require_group(&state.pool, chat_id).await?;
    if !db::is_chat_member(&state.pool, chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    db::update_group_details(
        &state.pool,
        chat_id,
        request.name.as_deref().map(str::trim),
        request.profile_pic.as_deref(),
    )
    .await?;

    if let Some(users) = request.users {
        let mut seen = std::collections::HashSet::new();
        let members: Vec<Uuid> = users.into_iter().filter(|id| seen.insert(*id)).collect();
        for member in &members {
            crate::auth::users::get_user_by_id(&state.pool, *member)
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?;
        }
        db::replace_members(&state.pool, chat_id, &members).await?;

        let admin_survives = chat
            .group_admin
            .map(|admin| members.contains(&admin))
            .unwrap_or(false);
        if !admin_survives {
            db::set_group_admin(&state.pool, chat_id, members.first().copied()).await?;
        }
    }

    let row = db::get_chat(&state.pool, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    Ok(Json(db::populate(&state.pool, row).await?))
}

/// `PUT /chats/groupadd` - add one member to a group. Adding an existing
/// member is a no-op and still returns the chat.
pub async fn add_to_group(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(request): Json<GroupMemberRequest>,
) -> Result<Json<Chat>, ApiError> {
    require_group(&state.pool, request.chat_id).await?;
    if !db::is_chat_member(&state.pool, request.chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }
    crate::auth::users::get_user_by_id(&state.pool, request.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    db::add_member(&state.pool, request.chat_id, request.user_id).await?;

    let row = db::get_chat(&state.pool, request.chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    Ok(Json(db::populate(&state.pool, row).await?))
}

/// `PUT /chats/groupremove` - remove one member from a group.
///
/// If the removed member was the admin, the role passes to the first
/// remaining member. A group emptied of members persists as an empty shell
/// until hard-deleted.
pub async fn remove_from_group(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(request): Json<GroupMemberRequest>,
) -> Result<Json<Chat>, ApiError> {
    let chat = require_group(&state.pool, request.chat_id).await?;
    if !db::is_chat_member(&state.pool, request.chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    db::remove_member(&state.pool, request.chat_id, request.user_id).await?;

    if chat.group_admin == Some(request.user_id) {
        let remaining = db::member_ids(&state.pool, request.chat_id).await?;
        db::set_group_admin(&state.pool, request.chat_id, remaining.first().copied()).await?;
    }

    let row = db::get_chat(&state.pool, request.chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    Ok(Json(db::populate(&state.pool, row).await?))
}

/// `PUT /chats/group/leave/{chat_id}` - leave a group. A departing admin
/// hands the role to the first remaining member; the last member leaving
/// leaves an empty group behind.
pub async fn leave_group(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<Chat>, ApiError> {
    let chat = require_group(&state.pool, chat_id).await?;
    if !db::is_chat_member(&state.pool, chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    db::remove_member(&state.pool, chat_id, auth.user_id).await?;

    if chat.group_admin == Some(auth.user_id) {
        let remaining = db::member_ids(&state.pool, chat_id).await?;
        db::set_group_admin(&state.pool, chat_id, remaining.first().copied()).await?;
    }

    tracing::info!("user {} left group {}", auth.user_id, chat_id);

    let row = db::get_chat(&state.pool, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    Ok(Json(db::populate(&state.pool, row).await?))
}

/// `PUT /chats/soft/{chat_id}` - hide a chat from the caller's own list.
/// Idempotent; other members' views are untouched.
pub async fn soft_delete_chat(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    db::get_chat(&state.pool, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    if !db::is_chat_member(&state.pool, chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    db::hide_chat_for(&state.pool, chat_id, auth.user_id).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /chats/{id}` - hard-delete a chat for everyone.
///
/// Any member may delete a 1:1 chat; only the admin may delete a group.
/// After the cascade the chat's room is told the chat is gone.
pub async fn delete_chat(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let chat = db::get_chat(&state.pool, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;

    if chat.is_group {
        if chat.group_admin != Some(auth.user_id) {
            return Err(ApiError::forbidden("Only the group admin can delete"));
        }
    } else if !db::is_chat_member(&state.pool, chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    db::delete_chat_cascade(&state.pool, chat_id).await?;
    tracing::info!("chat {} deleted by {}", chat_id, auth.user_id);

    // Fan-out after the persist is final; joined connections (the deleter's
    // included) learn the chat is gone.
    state
        .gateway
        .broadcast_to_room(chat_id, ServerEvent::ChatDeleted { chat_id });

    Ok(StatusCode::OK)
}
