//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the error type returned by request handlers. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response. Service-layer errors convert into it with `?`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::card::SignatureError;
use crate::persistence::LedgerError;
use crate::service::{AdminError, BookingError, CheckoutError};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "a valid email is required",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Handler error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 4000–4999 | Upstream        | 502 Bad Gateway              |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Required fields are blank.
    #[error("missing required fields")]
    MissingFields(Vec<&'static str>),

    /// Webhook signature verification failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// The refund action is unavailable for this deposit or deployment.
    #[error("refund unavailable: {0}")]
    RefundUnavailable(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Resource is in a state that forbids the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// A payment provider refused or failed the call.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MissingFields(_) => 1002,
            Self::InvalidSignature(_) => 1003,
            Self::RefundUnavailable(_) => 1004,
            Self::NotFound(_) => 2001,
            Self::Conflict(_) => 2002,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Upstream(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::MissingFields(_)
            | Self::InvalidSignature(_)
            | Self::RefundUnavailable(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::MissingFields(fields) => Some(fields.join(", ")),
            _ => None,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self::PersistenceError(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Validation(message) => Self::InvalidRequest(message),
            CheckoutError::Gateway(e) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::MissingFields(fields) => Self::MissingFields(fields),
            BookingError::Ledger(e) => e.into(),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::Validation(message) => Self::InvalidRequest(message),
            AdminError::RefundsDisabled
            | AdminError::ProcessorNotConfigured
            | AdminError::NoPaymentIntent(_) => Self::RefundUnavailable(e.to_string()),
            AdminError::NotFound(what) => Self::NotFound(what),
            AdminError::NotRefundable { .. } => Self::Conflict(e.to_string()),
            AdminError::Processor(e) => Self::Upstream(e.to_string()),
            AdminError::Ledger(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DepositId, PaymentStatus, Provider};
    use crate::gateway::GatewayError;

    #[test]
    fn checkout_errors_map_to_400_and_502() {
        let validation = ApiError::from(CheckoutError::Validation("bad".to_string()));
        let gateway = ApiError::from(CheckoutError::Gateway(GatewayError::Auth(
            "no token".to_string(),
        )));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn refund_errors_follow_their_status_table() {
        let cases = [
            (AdminError::RefundsDisabled, StatusCode::BAD_REQUEST),
            (AdminError::ProcessorNotConfigured, StatusCode::BAD_REQUEST),
            (
                AdminError::NoPaymentIntent(DepositId::new()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AdminError::NotFound("deposit x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                AdminError::NotRefundable {
                    id: DepositId::new(),
                    status: PaymentStatus::Pending,
                    provider: Provider::Card,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn missing_fields_are_listed_in_details() {
        let error = ApiError::MissingFields(vec!["name", "email"]);
        assert_eq!(error.details().as_deref(), Some("name, email"));
        assert_eq!(error.error_code(), 1002);
    }
}
