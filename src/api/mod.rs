//! REST API layer: route handlers, DTOs, middleware and router composition.

pub mod dto;
pub mod handlers;
pub mod middleware;

use axum::Router;

use crate::app_state::AppState;
use middleware::AdminCredentials;

/// Builds the complete API router. The admin routes sit behind basic auth
/// checked against `admin`.
pub fn build_router(admin: AdminCredentials) -> Router<AppState> {
    let admin_routes = handlers::admin::routes().layer(axum::middleware::from_fn_with_state(
        admin,
        middleware::require_basic_auth,
    ));

    Router::new()
        .merge(handlers::routes())
        .merge(admin_routes)
        .merge(handlers::system::routes())
}
