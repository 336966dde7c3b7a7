//! Operator endpoints behind a bearer key.
//!
//! - `GET /admin/cache`: live entry count and keys
//! - `DELETE /admin/cache[?pattern=...]`: invalidate matching keys, or all
//! - `GET /admin/rate-limits`: number of tracked windows

pub mod auth;
pub mod handlers;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/cache", get(get_cache).delete(invalidate_cache))
        .route("/admin/rate-limits", get(get_rate_limits))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
