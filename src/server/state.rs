//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::realtime::gateway::RealtimeGateway;

/// Central state container for the Axum application.
///
/// Both fields are cheap to clone: the pool is already reference-counted
/// internally and the gateway is behind an `Arc`. One gateway instance
/// serves the whole process, so every handler fans out through the same
/// connection registry.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gateway: Arc<RealtimeGateway>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let gateway = Arc::new(RealtimeGateway::new(pool.clone()));
        Self { pool, gateway }
    }
}

/// Lets handlers that only touch the store take `State<PgPool>`.
impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.pool.clone()
    }
}

/// Lets handlers that only push events take `State<Arc<RealtimeGateway>>`.
impl FromRef<AppState> for Arc<RealtimeGateway> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.gateway.clone()
    }
}
