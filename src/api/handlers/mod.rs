//! REST endpoint handlers organized by resource.

pub mod admin;
pub mod booking;
pub mod checkout;
pub mod payment;
pub mod system;
pub mod webhook;

use axum::Router;

use crate::app_state::AppState;

/// Composes the public routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(checkout::routes())
        .merge(payment::routes())
        .merge(webhook::routes())
        .merge(booking::routes())
}
