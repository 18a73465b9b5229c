//! Top-level router assembly.
//!
//! Three groups are merged: public auth routes, the token-protected REST
//! surface, and the WebSocket endpoint. `/ws` skips the HTTP auth
//! middleware on purpose - the transport handshake is open and identity
//! arrives in-band with the `setup` event.

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::realtime::socket::handle_socket_upgrade;
use crate::routes::api_routes::{protected_api_routes, public_auth_routes};
use crate::routes::chat_routes::protected_chat_routes;
use crate::server::state::AppState;

/// Create the Axum router with all routes configured.
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .merge(public_auth_routes())
        .merge(protected_api_routes(app_state.clone()))
        .merge(protected_chat_routes(app_state.clone()))
        .route("/ws", get(handle_socket_upgrade))
        .fallback(|| async { "404 Not Found" })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
