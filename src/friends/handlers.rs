//! HTTP handlers for the friend graph.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::friends::db;
use crate::middleware::auth::AuthUser;
use crate::models::notification::Notification;
use crate::models::user::UserSummary;
use crate::realtime::events::ServerEvent;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequestBody {
    pub target_user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequestBody {
    pub requester_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequestBody {
    pub sender_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// `POST /friends/request` - send a friend request.
///
/// The receiver gets a persisted notification, and a live push if any of
/// their connections is up. An offline receiver sees the notification on
/// their next fetch; nothing is lost.
pub async fn send_request(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(body): Json<SendRequestBody>,
) -> Result<StatusCode, ApiError> {
    if body.target_user_id == auth.user_id {
        return Err(ApiError::validation(
            "Cannot send a friend request to yourself",
        ));
    }

    crate::auth::users::get_user_by_id(&state.pool, body.target_user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if db::are_friends(&state.pool, auth.user_id, body.target_user_id).await? {
        return Err(ApiError::validation("Already friends"));
    }
    if db::has_pending_request(&state.pool, auth.user_id, body.target_user_id).await? {
        return Err(ApiError::validation("Request already sent"));
    }

    db::create_friend_request(&state.pool, auth.user_id, body.target_user_id).await?;
    let notification = db::create_notification(
        &state.pool,
        Notification::FRIEND_REQUEST,
        auth.user_id,
        body.target_user_id,
    )
    .await?;

    state.gateway.notify_user(
        body.target_user_id,
        ServerEvent::NotificationReceived { notification },
    );

    tracing::info!(
        "friend request from {} to {}",
        auth.user_id,
        body.target_user_id
    );
    Ok(StatusCode::OK)
}

/// `POST /friends/accept` - accept a pending request, creating the
/// symmetric friendship and clearing the request and its notification.
pub async fn accept_request(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(body): Json<AcceptRequestBody>,
) -> Result<StatusCode, ApiError> {
    if !db::has_pending_request(&state.pool, body.requester_id, auth.user_id).await? {
        return Err(ApiError::validation("No friend request from this user"));
    }

    db::create_friendship(&state.pool, auth.user_id, body.requester_id).await?;
    db::delete_friend_request(&state.pool, body.requester_id, auth.user_id).await?;
    db::delete_request_notifications(&state.pool, body.requester_id, auth.user_id).await?;

    tracing::info!("{} accepted request from {}", auth.user_id, body.requester_id);
    Ok(StatusCode::OK)
}

/// `POST /friends/reject` - clear a pending request and its notification.
/// Tolerant of an already-resolved request.
pub async fn reject_request(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(body): Json<RejectRequestBody>,
) -> Result<StatusCode, ApiError> {
    db::delete_friend_request(&state.pool, body.sender_id, auth.user_id).await?;
    db::delete_request_notifications(&state.pool, body.sender_id, auth.user_id).await?;
    Ok(StatusCode::OK)
}

/// `GET /friends` - the caller's friend list.
pub async fn list_friends(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let friends = db::friends_of(&state.pool, auth.user_id).await?;
    Ok(Json(friends))
}

/// `GET /friends/requests` - pending incoming requests, newest first.
pub async fn list_requests(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let requests = db::pending_requests_for(&state.pool, auth.user_id).await?;
    Ok(Json(requests))
}

/// `GET /friends/search?query=` - substring search over names and emails,
/// the caller excluded. An empty query returns an empty list.
pub async fn search(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let users = crate::auth::users::search_users(&state.pool, query, auth.user_id).await?;
    Ok(Json(users.into_iter().map(|u| u.summary()).collect()))
}

/// `DELETE /notifications/{id}` - dismiss one of the caller's own
/// notifications. Someone else's notification looks the same as a missing
/// one: 404 either way.
pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = db::delete_notification(&state.pool, notification_id, auth.user_id).await?;
    if !deleted {
        return Err(ApiError::not_found("Notification not found"));
    }
    Ok(StatusCode::OK)
}

/// `GET /notifications` - the caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = db::notifications_for(&state.pool, auth.user_id).await?;
    Ok(Json(notifications))
}
