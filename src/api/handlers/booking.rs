//! Booking form handler.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{BookingBody, BookingResponse};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `POST /booking` — Submit a consultation request.
///
/// # Errors
///
/// Returns [`ApiError::MissingFields`] when required fields are blank and
/// [`ApiError::PersistenceError`] when the booking cannot be stored.
#[utoipa::path(
    post,
    path = "/booking",
    tag = "Bookings",
    summary = "Submit a booking request",
    description = "Stores a consultation request and emails the studio. Image uploads are URLs of files already stored elsewhere.",
    request_body = BookingBody,
    responses(
        (status = 200, description = "Booking stored", body = BookingResponse),
        (status = 400, description = "Required fields missing", body = ErrorResponse),
    )
)]
pub async fn submit_booking(
    State(state): State<AppState>,
    payload: Result<Json<BookingBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let receipt = state.bookings.submit(body.into()).await?;
    Ok(Json(BookingResponse {
        ok: true,
        booking_id: receipt.booking.id,
        notified: receipt.notified.is_sent(),
    }))
}

/// Booking routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/booking", post(submit_booking))
}
