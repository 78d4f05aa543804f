//! Admin views, CSV exports and refunds. Mounted behind basic auth.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{AdminListParams, RefundBody};
use crate::app_state::AppState;
use crate::domain::{BookingId, Deposit, DepositId};
use crate::error::{ApiError, ErrorResponse};
use crate::service::{BookingWithDeposits, RefundOutcome};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

fn csv(filename: &'static str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        body,
    )
}

/// `GET /admin/bookings` — Bookings with their deposits.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for an unparseable date bound.
#[utoipa::path(
    get,
    path = "/admin/bookings",
    tag = "Admin",
    summary = "List bookings",
    description = "Newest first, at most 2000. `q` matches name, email, placement and size.",
    params(AdminListParams),
    responses(
        (status = 200, description = "Bookings", body = Vec<BookingWithDeposits>),
        (status = 400, description = "Invalid date bound", body = ErrorResponse),
        (status = 401, description = "Missing or wrong credentials"),
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<AdminListParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin.list_bookings(params.into()).await?))
}

/// `GET /admin/bookings/{id}` — One booking with its deposits.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for a malformed id and
/// [`ApiError::NotFound`] when no booking has it.
#[utoipa::path(
    get,
    path = "/admin/bookings/{id}",
    tag = "Admin",
    summary = "Booking detail",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking", body = BookingWithDeposits),
        (status = 404, description = "Unknown booking", body = ErrorResponse),
    )
)]
pub async fn booking_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: BookingId = id
        .parse()
        .map_err(|_| ApiError::InvalidRequest(format!("invalid booking id: {id}")))?;
    Ok(Json(state.admin.booking_detail(id).await?))
}

/// `GET /admin/deposits` — Deposits.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for an unparseable date bound.
#[utoipa::path(
    get,
    path = "/admin/deposits",
    tag = "Admin",
    summary = "List deposits",
    description = "Newest first, at most 4000. `q` matches email and session id.",
    params(AdminListParams),
    responses(
        (status = 200, description = "Deposits", body = Vec<Deposit>),
        (status = 400, description = "Invalid date bound", body = ErrorResponse),
    )
)]
pub async fn list_deposits(
    State(state): State<AppState>,
    Query(params): Query<AdminListParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin.list_deposits(params.into()).await?))
}

/// `GET /admin/bookings/export` — Bookings as CSV.
///
/// # Errors
///
/// As [`list_bookings`].
#[utoipa::path(
    get,
    path = "/admin/bookings/export",
    tag = "Admin",
    summary = "Export bookings",
    params(AdminListParams),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv", body = String),
    )
)]
pub async fn export_bookings(
    State(state): State<AppState>,
    Query(params): Query<AdminListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let body = state.admin.export_bookings_csv(params.into()).await?;
    Ok(csv("bookings.csv", body))
}

/// `GET /admin/deposits/export` — Deposits as CSV.
///
/// # Errors
///
/// As [`list_deposits`].
#[utoipa::path(
    get,
    path = "/admin/deposits/export",
    tag = "Admin",
    summary = "Export deposits",
    params(AdminListParams),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv", body = String),
    )
)]
pub async fn export_deposits(
    State(state): State<AppState>,
    Query(params): Query<AdminListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let body = state.admin.export_deposits_csv(params.into()).await?;
    Ok(csv("deposits.csv", body))
}

/// `POST /admin/refund` — Refund a card deposit.
///
/// # Errors
///
/// 400 when refunds are unavailable, 404 for an unknown deposit, 409 when
/// the deposit is not a completed card deposit, 502 when the processor
/// fails.
#[utoipa::path(
    post,
    path = "/admin/refund",
    tag = "Admin",
    summary = "Refund a deposit",
    description = "Refunds a completed card deposit through the card processor, in full unless amountCents is given, and marks it refunded.",
    request_body = RefundBody,
    responses(
        (status = 200, description = "Refund issued", body = RefundOutcome),
        (status = 400, description = "Refunds unavailable", body = ErrorResponse),
        (status = 404, description = "Unknown deposit", body = ErrorResponse),
        (status = 409, description = "Deposit not refundable", body = ErrorResponse),
        (status = 502, description = "Processor failure", body = ErrorResponse),
    )
)]
pub async fn refund(
    State(state): State<AppState>,
    payload: Result<Json<RefundBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let deposit_id: DepositId = body
        .deposit_id
        .parse()
        .map_err(|_| ApiError::InvalidRequest(format!("invalid depositId: {}", body.deposit_id)))?;
    Ok(Json(state.admin.refund(deposit_id, body.amount_cents).await?))
}

/// Admin routes, without the auth layer.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/bookings", get(list_bookings))
        .route("/admin/bookings/export", get(export_bookings))
        .route("/admin/bookings/{id}", get(booking_detail))
        .route("/admin/deposits", get(list_deposits))
        .route("/admin/deposits/export", get(export_deposits))
        .route("/admin/refund", post(refund))
}
