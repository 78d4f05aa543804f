//! Card processor webhook handling.
//!
//! Once the signature checks out the event is always acknowledged; ledger
//! and email failures are logged so the processor does not redeliver
//! forever.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::convergence::{Convergence, Settlement, converge};
use crate::card::event::CHECKOUT_SESSION_COMPLETED;
use crate::card::signature::{self, SignatureError};
use crate::card::{CheckoutSession, WebhookEvent};
use crate::domain::deposit::normalize_currency;
use crate::domain::{BookingId, DepositChange, NewDeposit, PaymentStatus, Provider};
use crate::notify::NotificationDispatch;
use crate::persistence::LedgerStore;

/// Body returned to the processor for an authenticated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct WebhookAck {
    /// `false` when the event could not be interpreted.
    pub ok: bool,
    /// Present (and `false`) only when the event was not handled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled: Option<bool>,
}

impl WebhookAck {
    const ACCEPTED: Self = Self {
        ok: true,
        handled: None,
    };
    const UNHANDLED: Self = Self {
        ok: false,
        handled: Some(false),
    };
}

/// Verifies and applies card processor webhooks.
#[derive(Debug, Clone)]
pub struct CardWebhookService {
    ledger: Arc<dyn LedgerStore>,
    notifier: NotificationDispatch,
    secret: Option<String>,
    tolerance_secs: i64,
}

impl CardWebhookService {
    /// Creates the service. Without a `secret` every webhook is rejected.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        notifier: NotificationDispatch,
        secret: Option<String>,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            ledger,
            notifier,
            secret,
            tolerance_secs,
        }
    }

    /// Verifies `signature` over the raw `payload` and applies the event.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] (mapped to HTTP 400) when the webhook
    /// is not authentic. Nothing is read or written in that case.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck, SignatureError> {
        if let Err(e) = signature::verify(
            payload,
            signature,
            self.secret.as_deref(),
            self.tolerance_secs,
            Utc::now().timestamp(),
        ) {
            tracing::warn!(error = %e, "card webhook rejected");
            return Err(e);
        }

        let event: WebhookEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "card webhook envelope unreadable");
                return Ok(WebhookAck::UNHANDLED);
            }
        };

        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "card webhook ignored");
            return Ok(WebhookAck::ACCEPTED);
        }

        match event.checkout_session() {
            Ok(session) => {
                self.settle(&session).await;
                Ok(WebhookAck::ACCEPTED)
            }
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "checkout session unreadable");
                Ok(WebhookAck::UNHANDLED)
            }
        }
    }

    async fn settle(&self, session: &CheckoutSession) {
        let raw_status = session.payment_status.as_deref().unwrap_or("paid");
        let status = raw_status.parse::<PaymentStatus>().unwrap_or_else(|_| {
            tracing::warn!(session_id = %session.id, payment_status = raw_status, "unknown session payment status; recording as pending");
            PaymentStatus::Pending
        });
        let amount_minor = session.amount_total.unwrap_or_default();
        let currency = normalize_currency(session.currency.as_deref().unwrap_or("usd"));
        let email = session.email();
        let booking_id = session
            .booking_reference()
            .and_then(|raw| match raw.parse::<BookingId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(session_id = %session.id, booking_ref = raw, "bookingId metadata is not a booking id");
                    None
                }
            });
        let metadata = serde_json::to_value(&session.metadata).unwrap_or_default();
        let payment_intent_id = session.payment_intent_id();

        let settlement = Settlement {
            session_id: session.id.clone(),
            reference: None,
            change: DepositChange {
                status,
                payment_intent_id: payment_intent_id.clone(),
                metadata: Some(metadata.clone()),
                email: email.clone(),
                amount_minor: Some(amount_minor),
                currency: Some(currency.clone()),
                booking_id,
            },
            insert: NewDeposit {
                session_id: session.id.clone(),
                email: email.clone(),
                amount_minor,
                currency: currency.clone(),
                payment_status: status,
                payment_intent_id,
                provider: Provider::Card,
                mode: session.mode.clone(),
                metadata,
                booking_id,
            },
        };

        match converge(self.ledger.as_ref(), &settlement).await {
            Ok(Convergence::Unchanged(deposit)) => {
                tracing::info!(
                    session_id = %session.id,
                    deposit_id = %deposit.id,
                    status = %deposit.payment_status,
                    "card session already recorded; notification not resent"
                );
                return;
            }
            Ok(converged) => {
                tracing::info!(
                    session_id = %session.id,
                    deposit_id = %converged.deposit().id,
                    ledger = ?converged.ledger_sync(),
                    "card deposit recorded"
                );
            }
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "card deposit not persisted");
            }
        }

        let report = self
            .notifier
            .card_deposit_received(&session.id, email.as_deref(), amount_minor, &currency, raw_status)
            .await;
        tracing::debug!(session_id = %session.id, ?report, "card deposit notifications dispatched");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::notify::NotificationSender;
    use crate::notify::tests::RecordingSender;
    use crate::persistence::InMemoryLedger;

    const SECRET: &str = "whsec_test";

    fn service(secret: Option<&str>) -> (CardWebhookService, Arc<InMemoryLedger>, Arc<RecordingSender>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let sender = Arc::new(RecordingSender::default());
        let notifier = NotificationDispatch::new(
            Arc::clone(&sender) as Arc<dyn NotificationSender>,
            "studio@example.com",
            "Ink Studio",
        );
        let service = CardWebhookService::new(
            Arc::clone(&ledger) as Arc<dyn LedgerStore>,
            notifier,
            secret.map(str::to_string),
            300,
        );
        (service, ledger, sender)
    }

    fn completed_event() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "customer_details": { "email": "ada@example.com" },
                "amount_total": 5000,
                "currency": "usd",
                "payment_status": "paid",
                "payment_intent": "pi_1",
                "mode": "payment",
                "metadata": { "bookingId": "not-a-uuid" }
            }}
        })
        .to_string()
        .into_bytes()
    }

    fn signed(payload: &[u8]) -> String {
        let Ok(header) = signature::sign(payload, SECRET, Utc::now().timestamp()) else {
            panic!("signing failed");
        };
        header
    }

    #[tokio::test]
    async fn completed_session_is_recorded_and_notified_once() {
        let (service, ledger, sender) = service(Some(SECRET));
        let payload = completed_event();
        let header = signed(&payload);

        let first = service.handle(&payload, Some(&header)).await;
        let redelivered = service.handle(&payload, Some(&header)).await;

        assert_eq!(first, Ok(WebhookAck::ACCEPTED));
        assert_eq!(redelivered, Ok(WebhookAck::ACCEPTED));
        assert_eq!(ledger.deposit_count().await, 1);

        let stored = ledger.find_deposit("cs_test_1", None).await.ok().flatten();
        let Some(stored) = stored else {
            panic!("deposit missing");
        };
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        assert_eq!(stored.provider, Provider::Card);
        assert_eq!(stored.currency, "USD");
        assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(stored.booking_id, None);

        assert_eq!(
            sender.recipients(),
            vec!["studio@example.com".to_string(), "ada@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn bad_signature_touches_nothing() {
        let (service, ledger, sender) = service(Some(SECRET));
        let payload = completed_event();
        let Ok(header) = signature::sign(&payload, "whsec_other", Utc::now().timestamp()) else {
            panic!("signing failed");
        };

        let result = service.handle(&payload, Some(&header)).await;

        assert_eq!(result, Err(SignatureError::Mismatch));
        assert_eq!(ledger.deposit_count().await, 0);
        assert!(sender.recipients().is_empty());
    }

    #[tokio::test]
    async fn missing_secret_rejects() {
        let (service, _, _) = service(None);
        let payload = completed_event();
        let header = signed(&payload);
        assert_eq!(
            service.handle(&payload, Some(&header)).await,
            Err(SignatureError::MissingSecret)
        );
    }

    #[tokio::test]
    async fn other_events_are_acknowledged_without_effect() {
        let (service, ledger, _) = service(Some(SECRET));
        let payload = br#"{"id":"evt_2","type":"payment_intent.created","data":{"object":{}}}"#;
        let header = signed(payload);

        assert_eq!(
            service.handle(payload, Some(&header)).await,
            Ok(WebhookAck::ACCEPTED)
        );
        assert_eq!(ledger.deposit_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_session_is_acknowledged_as_unhandled() {
        let (service, _, _) = service(Some(SECRET));
        let payload =
            br#"{"id":"evt_3","type":"checkout.session.completed","data":{"object":{"amount_total":1}}}"#;
        let header = signed(payload);

        let ack = service.handle(payload, Some(&header)).await;
        assert_eq!(ack, Ok(WebhookAck::UNHANDLED));
        let json = serde_json::to_value(WebhookAck::UNHANDLED).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "ok": false, "handled": false }));
    }
}
