//! Checkout request and response bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::{CheckoutRequest, CheckoutStarted};

/// Request body for `POST /checkout`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    /// Deposit in minor units; the configured default when absent.
    #[serde(default)]
    pub amount_cents: Option<i64>,
    /// ISO currency code; the configured default when absent.
    #[serde(default)]
    pub currency: Option<String>,
    /// Payer email.
    #[serde(default)]
    pub email: String,
    /// Booking the deposit secures.
    #[serde(default)]
    pub booking_id: Option<String>,
    /// Payer phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Payer first name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Payer last name.
    #[serde(default)]
    pub last_name: Option<String>,
}

impl From<CheckoutBody> for CheckoutRequest {
    fn from(body: CheckoutBody) -> Self {
        Self {
            amount_minor: body.amount_cents,
            currency: body.currency,
            email: body.email,
            booking_id: body.booking_id,
            phone_number: body.phone_number,
            first_name: body.first_name,
            last_name: body.last_name,
        }
    }
}

/// Response body for `POST /checkout`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Hosted payment page to send the payer to.
    pub redirect_url: String,
    /// Gateway tracking id.
    pub order_tracking_id: String,
    /// Merchant reference submitted with the order.
    pub merchant_reference: String,
}

impl From<CheckoutStarted> for CheckoutResponse {
    fn from(started: CheckoutStarted) -> Self {
        Self {
            redirect_url: started.redirect_url,
            order_tracking_id: started.order_tracking_id,
            merchant_reference: started.merchant_reference,
        }
    }
}
