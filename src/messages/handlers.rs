//! HTTP handlers for messages.
//!
//! The send path is persist-then-push: the message row and the chat's
//! latest-message pointer are written first, and only then does the chat's
//! room hear about it. The HTTP response carries the populated message
//! regardless of how the fan-out went.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::chats::db as chats_db;
use crate::error::ApiError;
use crate::messages::db;
use crate::middleware::auth::AuthUser;
use crate::models::message::{FileAttachment, Message};
use crate::realtime::events::ServerEvent;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file: Option<FileAttachment>,
}

/// `POST /messages` - send a message to a chat.
///
/// A message needs text content or a file attachment; an empty message is
/// rejected before touching the store.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let content = request.content.trim();
    if content.is_empty() && request.file.is_none() {
        return Err(ApiError::validation("Please fill all the fields"));
    }

    chats_db::get_chat(&state.pool, request.chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    if !chats_db::is_chat_member(&state.pool, request.chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    let message = db::insert_message(
        &state.pool,
        request.chat_id,
        auth.user_id,
        content,
        request.file.as_ref(),
    )
    .await?;

    // Persist is final; now the room hears it. The sender's own joined
    // connections receive the echo too and merge by message id.
    state.gateway.broadcast_to_room(
        request.chat_id,
        ServerEvent::MessageReceived {
            message: message.clone(),
        },
    );

    Ok(Json(message))
}

/// `GET /messages/{chat_id}` - full history of a chat, oldest first,
/// excluding messages the caller has soft-deleted.
pub async fn fetch_messages(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
    chats_db::get_chat(&state.pool, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    if !chats_db::is_chat_member(&state.pool, chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    let messages = db::messages_for_chat(&state.pool, chat_id, auth.user_id).await?;
    Ok(Json(messages))
}

/// `PUT /messages/soft/{message_id}` - hide a message from the caller's own
/// view. Idempotent, no fan-out; nobody else's history changes.
pub async fn soft_delete_message(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let message = db::get_message(&state.pool, message_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    if !chats_db::is_chat_member(&state.pool, message.chat_id, auth.user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    db::hide_message_for(&state.pool, message_id, auth.user_id).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /messages/{id}` - remove a message for everyone. Only the sender
/// may do this. The chat's latest-message pointer is recomputed and the
/// room is told which message vanished.
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let message = db::get_message(&state.pool, message_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    if message.sender.id != auth.user_id {
        return Err(ApiError::forbidden("Only the sender can delete a message"));
    }

    let chat_id = message.chat_id;
    db::delete_message(&state.pool, message_id, chat_id).await?;
    tracing::info!("message {} deleted by {}", message_id, auth.user_id);

    state.gateway.broadcast_to_room(
        chat_id,
        ServerEvent::MessageDeleted {
            message_id,
            chat_id,
        },
    );

    Ok(StatusCode::OK)
}
