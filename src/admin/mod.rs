//! Administrative API.
//!
//! Mounted under `/admin` only when `admin.enabled` is set. Every route
//! requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;

use self::auth::admin_auth_middleware;
use self::handlers::*;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/stats", get(get_stats))
        .route("/admin/breaker/reset", post(reset_breaker))
        .route("/admin/queue/clear", post(clear_queue))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
