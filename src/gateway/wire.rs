//! JSON bodies exchanged with the order gateway (Pesapal v3 shapes).

use serde::{Deserialize, Serialize};

/// Error object the gateway embeds in otherwise successful HTTP replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WireError {
    /// Error category.
    #[serde(default)]
    pub error_type: Option<String>,
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

impl WireError {
    /// Best available description.
    #[must_use]
    pub fn describe(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "unspecified gateway error".to_string())
    }

    /// Whether the gateway actually reported something.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.code.is_some() || self.message.is_some()
    }
}

/// `POST /api/Auth/RequestToken` body.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    /// Merchant consumer key.
    pub consumer_key: String,
    /// Merchant consumer secret.
    pub consumer_secret: String,
}

/// `POST /api/Auth/RequestToken` reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Token expiry timestamp (ISO-8601, UTC).
    #[serde(default, rename = "expiryDate")]
    pub expiry_date: Option<String>,
    /// Gateway-reported error.
    #[serde(default)]
    pub error: Option<WireError>,
}

/// `POST /api/URLSetup/RegisterIPN` body.
#[derive(Debug, Clone, Serialize)]
pub struct IpnRegistration {
    /// Notification URL.
    pub url: String,
    /// HTTP method the gateway uses to call it.
    pub ipn_notification_type: String,
}

/// `POST /api/URLSetup/RegisterIPN` reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpnResponse {
    /// Registered notification id.
    #[serde(default)]
    pub ipn_id: Option<String>,
    /// Gateway-reported error.
    #[serde(default)]
    pub error: Option<WireError>,
}

/// Billing contact attached to an order.
#[derive(Debug, Clone, Serialize)]
pub struct BillingAddress {
    /// Payer email.
    pub email_address: String,
    /// Payer phone.
    pub phone_number: String,
    /// ISO country code.
    pub country_code: String,
    /// Payer first name.
    pub first_name: String,
    /// Payer last name.
    pub last_name: String,
}

/// `POST /api/Transactions/SubmitOrderRequest` body.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Merchant reference.
    pub id: String,
    /// Currency code.
    pub currency: String,
    /// Amount in major units.
    pub amount: f64,
    /// Order description shown to the payer.
    pub description: String,
    /// Browser return URL.
    pub callback_url: String,
    /// Registered IPN id.
    pub notification_id: String,
    /// Payer contact.
    pub billing_address: BillingAddress,
}

/// `POST /api/Transactions/SubmitOrderRequest` reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderResponse {
    /// Gateway tracking id.
    #[serde(default)]
    pub order_tracking_id: Option<String>,
    /// Merchant reference echoed back.
    #[serde(default)]
    pub merchant_reference: Option<String>,
    /// Hosted payment page.
    #[serde(default)]
    pub redirect_url: Option<String>,
    /// Gateway-reported error.
    #[serde(default)]
    pub error: Option<WireError>,
}

/// `GET /api/Transactions/GetTransactionStatus` reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    /// `Completed`, `Pending`, `Failed`, `Cancelled` (or other gateway words).
    #[serde(default)]
    pub payment_status_description: Option<String>,
    /// Amount in major units.
    #[serde(default)]
    pub amount: Option<f64>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Payment method, e.g. `MpesaKE` or `Visa`.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Gateway confirmation code.
    #[serde(default)]
    pub confirmation_code: Option<String>,
    /// Masked payer account (phone or card).
    #[serde(default)]
    pub payment_account: Option<String>,
    /// Transaction timestamp as the gateway formats it.
    #[serde(default)]
    pub created_date: Option<String>,
    /// Merchant reference.
    #[serde(default)]
    pub merchant_reference: Option<String>,
    /// Gateway-reported error.
    #[serde(default)]
    pub error: Option<WireError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reply_tolerates_null_error() {
        let body = r#"{
            "payment_method": "MpesaKE",
            "amount": 15.5,
            "created_date": "2024-03-01T10:00:00.000Z",
            "confirmation_code": "QCX1",
            "payment_status_description": "Completed",
            "payment_account": "2547xxxxx123",
            "currency": "KES",
            "error": { "error_type": null, "code": null, "message": null },
            "status": "200"
        }"#;
        let parsed: StatusResponse = serde_json::from_str(body).unwrap_or_default();
        assert_eq!(parsed.payment_status_description.as_deref(), Some("Completed"));
        assert_eq!(parsed.amount, Some(15.5));
        assert!(parsed.error.is_some_and(|e| !e.is_set()));
    }

    #[test]
    fn token_reply_reads_camel_case_expiry() {
        let body = r#"{"token":"abc","expiryDate":"2024-03-01T10:05:00.000Z","status":"200"}"#;
        let parsed: TokenResponse = serde_json::from_str(body).unwrap_or_default();
        assert_eq!(parsed.token.as_deref(), Some("abc"));
        assert!(parsed.expiry_date.is_some());
    }
}
