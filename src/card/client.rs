//! Outbound calls to the card processor.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

const REFUNDS_URL: &str = "https://api.stripe.com/v1/refunds";

/// Card processor call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardProcessorError {
    /// The HTTP exchange failed.
    #[error("card processor request failed: {0}")]
    Request(String),

    /// The processor rejected the call.
    #[error("card processor rejected the request: {0}")]
    Rejected(String),
}

/// A refund the processor accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    /// Refund id.
    pub id: String,
    /// Processor status, e.g. `succeeded` or `pending`.
    pub status: String,
    /// Refunded amount in minor units.
    pub amount_minor: Option<i64>,
}

/// Card processor operations used by the admin refund action.
#[async_trait]
pub trait CardProcessor: Send + Sync + std::fmt::Debug {
    /// Refunds `payment_intent_id`, in full when `amount_minor` is `None`.
    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<RefundReceipt, CardProcessorError>;
}

#[derive(Debug, Deserialize)]
struct RefundBody {
    id: Option<String>,
    status: Option<String>,
    amount: Option<i64>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Stripe REST client authenticated with the secret key.
#[derive(Clone)]
pub struct StripeClient {
    secret_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient").finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Builds a client for `secret_key`.
    ///
    /// # Errors
    ///
    /// Returns [`CardProcessorError::Request`] if the HTTP client cannot be built.
    pub fn new(secret_key: impl Into<String>, timeout: Duration) -> Result<Self, CardProcessorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CardProcessorError::Request(e.to_string()))?;
        Ok(Self {
            secret_key: secret_key.into(),
            client,
        })
    }
}

fn refund_form(payment_intent_id: &str, amount_minor: Option<i64>) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("payment_intent", payment_intent_id);
    if let Some(amount) = amount_minor {
        form.append_pair("amount", &amount.to_string());
    }
    form.finish()
}

#[async_trait]
impl CardProcessor for StripeClient {
    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<RefundReceipt, CardProcessorError> {
        let response = self
            .client
            .post(REFUNDS_URL)
            .bearer_auth(&self.secret_key)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(refund_form(payment_intent_id, amount_minor))
            .send()
            .await
            .map_err(|e| CardProcessorError::Request(e.to_string()))?;

        let status = response.status();
        let body: RefundBody = response
            .json()
            .await
            .map_err(|e| CardProcessorError::Request(e.to_string()))?;

        if !status.is_success() || body.error.is_some() {
            let message = body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(CardProcessorError::Rejected(message));
        }

        Ok(RefundReceipt {
            id: body.id.unwrap_or_default(),
            status: body.status.unwrap_or_else(|| "pending".to_string()),
            amount_minor: body.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_refund_form_has_no_amount() {
        assert_eq!(refund_form("pi_1", None), "payment_intent=pi_1");
    }

    #[test]
    fn partial_refund_form_carries_amount() {
        assert_eq!(
            refund_form("pi_1", Some(2500)),
            "payment_intent=pi_1&amount=2500"
        );
    }

    #[test]
    fn debug_hides_secret() {
        let Ok(client) = StripeClient::new("sk_live_secret", Duration::from_secs(5)) else {
            return;
        };
        assert!(!format!("{client:?}").contains("sk_live"));
    }
}
