//! Service layer: business logic orchestration.
//!
//! [`CheckoutService`] starts gateway orders, [`ReconciliationService`]
//! settles them, [`CardWebhookService`] applies card processor events and
//! [`AdminService`] backs the operator views. Every settlement path goes
//! through [`convergence::converge`].

pub mod admin;
pub mod booking;
pub mod card_webhook;
pub mod checkout;
pub mod convergence;
pub mod export;
pub mod reconciliation;

pub use admin::{AdminError, AdminQuery, AdminService, RefundOutcome};
pub use booking::{BookingError, BookingReceipt, BookingService};
pub use card_webhook::{CardWebhookService, WebhookAck};
pub use checkout::{CheckoutError, CheckoutRequest, CheckoutService, CheckoutSettings, CheckoutStarted};
pub use export::BookingWithDeposits;
pub use reconciliation::{ReconcileError, ReconcileOutcome, ReconciliationService};
