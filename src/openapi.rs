//! OpenAPI document for the HTTP surface, served by Swagger UI when the
//! `swagger-ui` feature is on.

use utoipa::OpenApi;

use crate::api::dto::{
    BookingBody, BookingResponse, CheckoutBody, CheckoutResponse, IpnAck, IpnNotification,
    RefundBody,
};
use crate::api::handlers::{admin, booking, checkout, payment, system, webhook};
use crate::domain::{Booking, Deposit, LedgerSync, PaymentStatus, Provider, Receipt};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::{BookingWithDeposits, RefundOutcome, WebhookAck};

/// API documentation root.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "studio-payments",
        description = "Tattoo studio bookings, deposit checkout and payment reconciliation."
    ),
    paths(
        system::health_handler,
        checkout::start_checkout,
        payment::payment_callback,
        payment::ipn_post,
        payment::ipn_get,
        webhook::card_webhook,
        booking::submit_booking,
        admin::list_bookings,
        admin::booking_detail,
        admin::list_deposits,
        admin::export_bookings,
        admin::export_deposits,
        admin::refund,
    ),
    components(schemas(
        system::HealthResponse,
        CheckoutBody,
        CheckoutResponse,
        IpnNotification,
        IpnAck,
        WebhookAck,
        BookingBody,
        BookingResponse,
        RefundBody,
        RefundOutcome,
        Booking,
        BookingWithDeposits,
        Deposit,
        PaymentStatus,
        Provider,
        Receipt,
        LedgerSync,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Checkout", description = "Deposit checkout"),
        (name = "Payments", description = "Gateway returns, notifications and card webhooks"),
        (name = "Bookings", description = "Consultation requests"),
        (name = "Admin", description = "Operator views, exports and refunds"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/checkout",
            "/payment/callback",
            "/payment/ipn",
            "/payment/webhook",
            "/booking",
            "/admin/bookings/{id}",
            "/admin/refund",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
