//! Card processor integration: webhook signatures, event shapes and the
//! refund client.

pub mod client;
pub mod event;
pub mod signature;

pub use client::{CardProcessor, CardProcessorError, RefundReceipt, StripeClient};
pub use event::{CheckoutSession, WebhookEvent};
pub use signature::SignatureError;
