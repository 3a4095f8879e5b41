//! # gatehouse_api
//!
//! HTTP API library for Gatehouse.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use gatehouse_core::auth::StreamAuthenticator;
use gatehouse_core::exec::ExecGate;
use gatehouse_core::store::{ReviewStore, SessionStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{sessions, whoami};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<StreamAuthenticator>,
    pub sessions: Arc<dyn SessionStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub gate: Arc<ExecGate>,
}

/// Run embedded database migrations.
///
/// Delegates to `gatehouse_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    gatehouse_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
///
/// Every route is authenticated.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route(routes::GET_API_WHOAMI, get(whoami::whoami_handler))
        .route(routes::GET_API_SESSIONS, get(sessions::find_all_handler))
        .route(routes::GET_API_SESSIONS_ID, get(sessions::find_one_handler))
        .route(
            routes::GET_API_SESSIONS_ID_STATUS_HISTORY,
            get(sessions::status_history_handler),
        )
        .route(
            routes::POST_API_SESSIONS_ID_EXEC,
            post(sessions::exec_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate_call,
        ));

    Router::new()
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
