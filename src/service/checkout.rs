//! Checkout: validates a deposit request, submits the order to the gateway
//! and records a pending deposit.
//!
//! The pending deposit is a hint, not a requirement. If the write fails the
//! payer is still redirected and reconciliation creates the row later.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::deposit::normalize_currency;
use crate::domain::{BookingId, NewDeposit, PaymentStatus, Provider};
use crate::gateway::{GatewayClient, GatewayError, OrderSubmission, Payer};
use crate::persistence::LedgerStore;

/// Why checkout could not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// The request is malformed.
    #[error("{0}")]
    Validation(String),

    /// The gateway refused or failed the order.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// A deposit checkout request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Amount in minor units; the configured default when absent.
    pub amount_minor: Option<i64>,
    /// Currency code; the configured default when absent.
    pub currency: Option<String>,
    /// Payer email (required).
    pub email: String,
    /// Booking the deposit is for.
    pub booking_id: Option<String>,
    /// Payer phone.
    pub phone_number: Option<String>,
    /// Payer first name.
    pub first_name: Option<String>,
    /// Payer last name.
    pub last_name: Option<String>,
}

/// Where to send the payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStarted {
    /// Hosted payment page.
    pub redirect_url: String,
    /// Gateway tracking id.
    pub order_tracking_id: String,
    /// Merchant reference.
    pub merchant_reference: String,
}

/// Checkout defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Amount used when the request has none.
    pub default_amount_minor: i64,
    /// Currency used when the request has none.
    pub default_currency: String,
    /// Billing country code.
    pub country_code: String,
    /// Browser return URL.
    pub callback_url: String,
    /// Order description shown on the hosted page.
    pub description: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the merchant reference for an order.
///
/// `booking_<id>_<millis>` when a booking is known, else
/// `order_<millis>_<9 random chars>`.
#[must_use]
pub fn merchant_reference(booking_id: Option<BookingId>, millis: i64) -> String {
    match booking_id {
        Some(id) => format!("booking_{id}_{millis}"),
        None => {
            let suffix: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(9)
                .collect();
            format!("order_{millis}_{suffix}")
        }
    }
}

/// Starts order-gateway checkouts.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    gateway: Arc<GatewayClient>,
    ledger: Arc<dyn LedgerStore>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        gateway: Arc<GatewayClient>,
        ledger: Arc<dyn LedgerStore>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            gateway,
            ledger,
            settings,
        }
    }

    /// Validates `request`, submits the order and writes a pending deposit.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Validation`] for a missing email, a non-positive
    /// amount, a malformed currency or booking id; [`CheckoutError::Gateway`]
    /// when the order cannot be submitted.
    pub async fn start(&self, request: CheckoutRequest) -> Result<CheckoutStarted, CheckoutError> {
        let email = request.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(CheckoutError::Validation(
                "a valid email is required".to_string(),
            ));
        }

        let amount_minor = request
            .amount_minor
            .unwrap_or(self.settings.default_amount_minor);
        if amount_minor <= 0 {
            return Err(CheckoutError::Validation(
                "amountCents must be positive".to_string(),
            ));
        }

        let currency = normalize_currency(
            non_blank(request.currency.as_deref())
                .unwrap_or(self.settings.default_currency.as_str()),
        );
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CheckoutError::Validation(format!(
                "invalid currency code: {currency}"
            )));
        }

        let booking_id = non_blank(request.booking_id.as_deref())
            .map(|raw| {
                raw.parse::<BookingId>()
                    .map_err(|_| CheckoutError::Validation(format!("invalid bookingId: {raw}")))
            })
            .transpose()?;

        let reference = merchant_reference(booking_id, Utc::now().timestamp_millis());
        let order = OrderSubmission {
            merchant_reference: reference.clone(),
            amount_minor,
            currency: currency.clone(),
            description: self.settings.description.clone(),
            callback_url: self.settings.callback_url.clone(),
            payer: Payer {
                email: email.clone(),
                phone: non_blank(request.phone_number.as_deref())
                    .unwrap_or_default()
                    .to_string(),
                country_code: self.settings.country_code.clone(),
                first_name: non_blank(request.first_name.as_deref())
                    .unwrap_or("Customer")
                    .to_string(),
                last_name: non_blank(request.last_name.as_deref())
                    .unwrap_or("User")
                    .to_string(),
            },
        };

        let submitted = self.gateway.submit_order(&order).await.map_err(|e| {
            tracing::error!(merchant_reference = %reference, error = %e, "checkout failed");
            CheckoutError::from(e)
        })?;

        if !submitted.channel_registered {
            tracing::warn!(
                tracking_id = %submitted.tracking_id,
                "order submitted without a registered notification channel"
            );
        }

        let pending = NewDeposit {
            session_id: submitted.tracking_id.clone(),
            email: Some(email),
            amount_minor,
            currency,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: Some(submitted.merchant_reference.clone()),
            provider: Provider::OrderGateway,
            mode: Some(self.gateway.environment().as_str().to_string()),
            metadata: serde_json::json!({
                "orderTrackingId": submitted.tracking_id,
                "merchantReference": submitted.merchant_reference,
                "notificationChannelRegistered": submitted.channel_registered,
            }),
            booking_id,
        };
        if let Err(e) = self.ledger.insert_deposit(pending).await {
            tracing::warn!(
                tracking_id = %submitted.tracking_id,
                error = %e,
                "pending deposit not recorded; reconciliation will create it"
            );
        }

        tracing::info!(
            tracking_id = %submitted.tracking_id,
            merchant_reference = %submitted.merchant_reference,
            amount_minor,
            "checkout started"
        );

        Ok(CheckoutStarted {
            redirect_url: submitted.redirect_url,
            order_tracking_id: submitted.tracking_id,
            merchant_reference: submitted.merchant_reference,
        })
    }
}
