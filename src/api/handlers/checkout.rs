//! Deposit checkout handler.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CheckoutBody, CheckoutResponse};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `POST /checkout` — Start a deposit payment.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for a bad request and
/// [`ApiError::Upstream`] when the gateway refuses the order.
#[utoipa::path(
    post,
    path = "/checkout",
    tag = "Checkout",
    summary = "Start a deposit checkout",
    description = "Submits a deposit order to the payment gateway, records a pending deposit and returns the hosted payment page the customer should be sent to.",
    request_body = CheckoutBody,
    responses(
        (status = 200, description = "Order submitted", body = CheckoutResponse),
        (status = 400, description = "Invalid email, amount, currency or booking id", body = ErrorResponse),
        (status = 502, description = "Gateway refused the order", body = ErrorResponse),
    )
)]
pub async fn start_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let started = state.checkout.start(body.into()).await?;
    Ok(Json(CheckoutResponse::from(started)))
}

/// Checkout routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/checkout", post(start_checkout))
}
