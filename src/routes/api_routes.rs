//! Auth, friends and notification routes.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::auth::handlers::{get_me, login, signup};
use crate::friends::handlers::{
    accept_request, delete_notification, list_friends, list_notifications, list_requests,
    reject_request, search, send_request,
};
use crate::middleware::auth::auth_middleware;
use crate::server::state::AppState;

/// Routes reachable without a token: registration and login.
pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

/// Token-protected account and friend-graph routes.
pub fn protected_api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/friends", get(list_friends))
        .route("/friends/request", post(send_request))
        .route("/friends/accept", post(accept_request))
        .route("/friends/reject", post(reject_request))
        .route("/friends/requests", get(list_requests))
        .route("/friends/search", get(search))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}", delete(delete_notification))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
