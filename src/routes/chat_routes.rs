//! Chat and message routes, all token-protected.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::chats::handlers::{
    access_chat, add_to_group, create_group, delete_chat, fetch_chats, leave_group,
    remove_from_group, rename_group, soft_delete_chat, update_group,
};
use crate::messages::handlers::{
    delete_message, fetch_messages, send_message, soft_delete_message,
};
use crate::middleware::auth::auth_middleware;
use crate::server::state::AppState;

pub fn protected_chat_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/chats", post(access_chat).get(fetch_chats))
        .route("/chats/group", post(create_group))
        .route("/chats/rename", put(rename_group))
        .route("/chats/group/{chat_id}", put(update_group))
        .route("/chats/groupadd", put(add_to_group))
        .route("/chats/groupremove", put(remove_from_group))
        .route("/chats/group/leave/{chat_id}", put(leave_group))
        .route("/chats/soft/{chat_id}", put(soft_delete_chat))
        .route("/chats/{id}", delete(delete_chat))
        .route("/messages", post(send_message))
        // One path shape, two meanings: GET reads the param as a chat id,
        // DELETE as a message id. Axum requires a single registration.
        .route("/messages/{id}", get(fetch_messages).delete(delete_message))
        .route("/messages/soft/{message_id}", put(soft_delete_message))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
