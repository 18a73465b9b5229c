//! Server initialization.
//!
//! Startup order: connect and migrate the store, build the shared state
//! (which constructs the one process-wide realtime gateway), then assemble
//! the router.

use axum::Router;

use crate::routes::router::create_router;
use crate::server::config::load_database;
use crate::server::state::AppState;

/// Create the Axum application, fully wired.
pub async fn create_app() -> Result<Router<()>, sqlx::Error> {
    tracing::info!("Initializing server");

    let pool = load_database().await?;
    let app_state = AppState::new(pool);

    Ok(create_router(app_state))
}
