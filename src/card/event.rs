//! Card processor webhook event shapes.

use std::collections::HashMap;

use serde::Deserialize;

/// Event type that settles a checkout session.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Webhook envelope. `data.object` is decoded lazily because its shape
/// depends on `type`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event id.
    #[serde(default)]
    pub id: String,
    /// Event type, e.g. `checkout.session.completed`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    pub data: EventData,
}

/// `data` member of a [`WebhookEvent`].
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event refers to.
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Decodes `data.object` as a checkout session.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the object is not a session.
    pub fn checkout_session(&self) -> Result<CheckoutSession, serde_json::Error> {
        CheckoutSession::deserialize(&self.data.object)
    }
}

/// `payment_intent` is either an id or an expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PaymentIntentRef {
    /// Bare id.
    Id(String),
    /// Expanded object.
    Object {
        /// Intent id.
        id: String,
    },
}

impl PaymentIntentRef {
    /// The intent id in either form.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

/// Customer details collected on the hosted page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    /// Email entered by the customer.
    #[serde(default)]
    pub email: Option<String>,
}

/// The fields of a checkout session this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session id; becomes the deposit `session_id`.
    pub id: String,
    /// Collected customer details.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Email prefilled at session creation.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Lowercase currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Linked payment intent.
    #[serde(default)]
    pub payment_intent: Option<PaymentIntentRef>,
    /// Session mode, e.g. `payment`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Merchant metadata; `bookingId` links the booking.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Collected email, else the prefilled one.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.clone())
            .or_else(|| self.customer_email.clone())
            .filter(|e| !e.trim().is_empty())
    }

    /// The payment intent id, if any.
    #[must_use]
    pub fn payment_intent_id(&self) -> Option<String> {
        self.payment_intent.as_ref().map(|p| p.id().to_string())
    }

    /// `bookingId` metadata, if present and non-blank.
    #[must_use]
    pub fn booking_reference(&self) -> Option<&str> {
        self.metadata
            .get("bookingId")
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}
