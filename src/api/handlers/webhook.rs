//! Card processor webhook handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::card::signature::SIGNATURE_HEADER;
use crate::error::{ApiError, ErrorResponse};
use crate::service::WebhookAck;

/// `POST /payment/webhook` — Signed card processor event.
///
/// # Errors
///
/// Returns [`ApiError::InvalidSignature`] when the signature header is
/// missing, malformed, stale or does not match.
#[utoipa::path(
    post,
    path = "/payment/webhook",
    tag = "Payments",
    summary = "Card processor webhook",
    description = "Verifies the signature over the raw body and records completed checkout sessions. Authentic events are always answered 200.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Signature verification failed", body = ErrorResponse),
    )
)]
pub async fn card_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = state.card_webhooks.handle(&body, signature).await?;
    Ok(Json(ack))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/payment/webhook", post(card_webhook))
}
