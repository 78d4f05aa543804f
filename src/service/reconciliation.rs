//! Reconciliation service: turns an authoritative gateway status into
//! ledger state and confirmation emails.
//!
//! Every inbound trigger (browser callback, IPN POST, IPN GET) calls
//! [`ReconciliationService::reconcile`] with the same tracking id, possibly
//! concurrently. The status is always queried fresh; the ledger write goes
//! through [`converge`], so repeated or racing calls end on one deposit row.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::convergence::{Convergence, Settlement, converge};
use crate::domain::deposit::{normalize_currency, to_minor_units};
use crate::domain::{
    Booking, BookingId, DepositChange, LedgerSync, NewDeposit, PaymentStatus, Provider, Receipt,
};
use crate::gateway::{GatewayClient, GatewayError, GatewayStatus, TransactionStatus};
use crate::notify::NotificationDispatch;
use crate::persistence::LedgerStore;

/// Why a reconciliation did not produce a receipt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Missing tracking id or merchant reference.
    #[error("{0}")]
    Validation(String),

    /// The status query (or the token it needs) failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The gateway reports a status other than `Completed`.
    #[error("payment not completed: {0}")]
    NotCompleted(String),
}

/// Tagged outward form of a reconciliation result.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    /// Whether the payment is confirmed.
    pub success: bool,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Receipt on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<Receipt>,
}

impl From<Result<Receipt, ReconcileError>> for ReconcileOutcome {
    fn from(result: Result<Receipt, ReconcileError>) -> Self {
        match result {
            Ok(receipt) => Self {
                success: true,
                message: None,
                payment_details: Some(receipt),
            },
            Err(e) => Self {
                success: false,
                message: Some(e.to_string()),
                payment_details: None,
            },
        }
    }
}

/// Extracts the booking id from a `booking_<uuid>_<millis>` merchant
/// reference.
#[must_use]
pub fn booking_from_reference(reference: &str) -> Option<BookingId> {
    let rest = reference.strip_prefix("booking_")?;
    let (id, _millis) = rest.rsplit_once('_')?;
    id.parse().ok()
}

fn gateway_metadata(status: &TransactionStatus, merchant_reference: &str) -> serde_json::Value {
    serde_json::json!({
        "orderTrackingId": status.tracking_id,
        "merchantReference": merchant_reference,
        "paymentStatusDescription": status.status.as_str(),
        "confirmationCode": status.confirmation_code,
        "paymentMethod": status.payment_method,
        "paymentAccount": status.payment_account,
        "createdDate": status.created_date,
    })
}

/// Reconciles order-gateway payments against the ledger.
#[derive(Debug, Clone)]
pub struct ReconciliationService {
    gateway: Arc<GatewayClient>,
    ledger: Arc<dyn LedgerStore>,
    notifier: NotificationDispatch,
    default_currency: String,
}

impl ReconciliationService {
    /// Creates the service. `default_currency` is recorded when the gateway
    /// omits a currency.
    #[must_use]
    pub fn new(
        gateway: Arc<GatewayClient>,
        ledger: Arc<dyn LedgerStore>,
        notifier: NotificationDispatch,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            ledger,
            notifier,
            default_currency: default_currency.into(),
        }
    }

    /// Confirms the payment behind `tracking_id` and brings the ledger in
    /// line with it.
    ///
    /// A ledger failure after the gateway confirmed the payment does not
    /// fail the call: the receipt comes back with [`LedgerSync::Deferred`]
    /// and a later notification repairs the row.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::Validation`] for blank identifiers,
    /// [`ReconcileError::Gateway`] when the status cannot be fetched, and
    /// [`ReconcileError::NotCompleted`] when the payment is not complete.
    pub async fn reconcile(
        &self,
        tracking_id: &str,
        merchant_reference: &str,
    ) -> Result<Receipt, ReconcileError> {
        let tracking_id = tracking_id.trim();
        let merchant_reference = merchant_reference.trim();
        if tracking_id.is_empty() || merchant_reference.is_empty() {
            return Err(ReconcileError::Validation(
                "missing order tracking id or merchant reference".to_string(),
            ));
        }

        let status = self.gateway.get_status(tracking_id).await?;
        match &status.status {
            GatewayStatus::Completed => {}
            GatewayStatus::Failed | GatewayStatus::Cancelled => {
                self.mark_failed(&status, merchant_reference).await;
                return Err(ReconcileError::NotCompleted(status.status.to_string()));
            }
            other => {
                tracing::info!(tracking_id, status = %other, "payment not yet completed");
                return Err(ReconcileError::NotCompleted(other.to_string()));
            }
        }

        let amount_minor = to_minor_units(status.amount).unwrap_or_else(|| {
            tracing::warn!(
                tracking_id,
                amount = status.amount,
                "gateway reported an unusable amount; recording 0"
            );
            0
        });
        let currency = if status.currency.trim().is_empty() {
            normalize_currency(&self.default_currency)
        } else {
            normalize_currency(&status.currency)
        };
        let reference_booking = booking_from_reference(merchant_reference);
        let metadata = gateway_metadata(&status, merchant_reference);

        let settlement = Settlement {
            session_id: tracking_id.to_string(),
            reference: Some(merchant_reference.to_string()),
            change: DepositChange {
                payment_intent_id: status.confirmation_code.clone(),
                metadata: Some(metadata.clone()),
                amount_minor: Some(amount_minor),
                currency: Some(currency.clone()),
                booking_id: reference_booking,
                ..DepositChange::to_status(PaymentStatus::Completed)
            },
            insert: NewDeposit {
                session_id: tracking_id.to_string(),
                email: None,
                amount_minor,
                currency: currency.clone(),
                payment_status: PaymentStatus::Completed,
                payment_intent_id: status
                    .confirmation_code
                    .clone()
                    .or_else(|| Some(merchant_reference.to_string())),
                provider: Provider::OrderGateway,
                mode: Some(self.gateway.environment().as_str().to_string()),
                metadata,
                booking_id: reference_booking,
            },
        };

        let (deposit, ledger) = match converge(self.ledger.as_ref(), &settlement).await {
            Ok(converged) => {
                let sync = converged.ledger_sync();
                tracing::info!(
                    tracking_id,
                    deposit_id = %converged.deposit().id,
                    ledger = ?sync,
                    "deposit reconciled"
                );
                let deposit = match converged {
                    Convergence::Inserted(d)
                    | Convergence::Updated { deposit: d, .. }
                    | Convergence::Unchanged(d) => d,
                };
                (Some(deposit), sync)
            }
            Err(e) => {
                tracing::error!(
                    tracking_id,
                    merchant_reference,
                    error = %e,
                    "LEDGER OUT OF SYNC: gateway confirmed payment but deposit write failed"
                );
                (None, LedgerSync::Deferred)
            }
        };

        let booking_id = deposit
            .as_ref()
            .and_then(|d| d.booking_id)
            .or(reference_booking);
        let booking = self.load_booking(booking_id).await;

        let customer_name = booking
            .as_ref()
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "Customer".to_string());
        let customer_email = booking
            .as_ref()
            .map(|b| b.email.clone())
            .or_else(|| deposit.as_ref().and_then(|d| d.email.clone()))
            .or_else(|| status.payment_account.clone())
            .unwrap_or_default();

        let receipt = Receipt {
            booking_id,
            deposit_id: deposit.as_ref().map(|d| d.id),
            customer_name,
            customer_email,
            amount: status.amount,
            amount_minor,
            currency,
            payment_method: status
                .payment_method
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            transaction_id: status
                .confirmation_code
                .clone()
                .unwrap_or_else(|| tracking_id.to_string()),
            payment_date: status
                .created_date
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            status: GatewayStatus::Completed.to_string(),
            order_tracking_id: tracking_id.to_string(),
            merchant_reference: merchant_reference.to_string(),
            ledger,
        };

        if ledger.is_first_confirmation() {
            let report = self
                .notifier
                .deposit_confirmed(&receipt, booking.as_ref())
                .await;
            tracing::debug!(tracking_id, ?report, "confirmation dispatched");
        } else {
            tracing::info!(tracking_id, "deposit already settled; confirmation not resent");
        }

        Ok(receipt)
    }

    async fn load_booking(&self, id: Option<BookingId>) -> Option<Booking> {
        let id = id?;
        match self.ledger.get_booking(id).await {
            Ok(booking) => booking,
            Err(e) => {
                tracing::warn!(booking_id = %id, error = %e, "booking lookup failed; receipt uses payer account");
                None
            }
        }
    }

    /// Best-effort: moves a still-pending deposit to `failed`.
    async fn mark_failed(&self, status: &TransactionStatus, merchant_reference: &str) {
        let tracking_id = status.tracking_id.as_str();
        let existing = match self
            .ledger
            .find_deposit(tracking_id, Some(merchant_reference))
            .await
        {
            Ok(Some(deposit)) => deposit,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(tracking_id, error = %e, "could not look up deposit to mark failed");
                return;
            }
        };

        let change = DepositChange {
            metadata: Some(gateway_metadata(status, merchant_reference)),
            ..DepositChange::to_status(PaymentStatus::Failed)
        };
        match self
            .ledger
            .transition_deposit(existing.id, &[PaymentStatus::Pending], &change)
            .await
        {
            Ok(Some(_)) => {
                tracing::info!(tracking_id, deposit_id = %existing.id, status = %status.status, "deposit marked failed");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(tracking_id, error = %e, "could not mark deposit failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::gateway::Environment;
    use crate::gateway::tests::{MockTransport, credentials};
    use crate::gateway::wire::StatusResponse;
    use crate::notify::tests::RecordingSender;
    use crate::notify::NotificationSender;
    use crate::persistence::InMemoryLedger;

    struct Harness {
        service: ReconciliationService,
        transport: Arc<MockTransport>,
        ledger: Arc<InMemoryLedger>,
        sender: Arc<RecordingSender>,
    }

    fn status(description: &str, amount: f64) -> StatusResponse {
        StatusResponse {
            payment_status_description: Some(description.to_string()),
            amount: Some(amount),
            currency: Some("usd".to_string()),
            payment_method: Some("MpesaKE".to_string()),
            confirmation_code: Some("CONF-1".to_string()),
            payment_account: Some("2547xxxx123".to_string()),
            created_date: Some("2024-03-01T10:00:00Z".to_string()),
            ..StatusResponse::default()
        }
    }

    fn harness(reply: StatusResponse, sender: RecordingSender) -> Harness {
        let transport = Arc::new(MockTransport::new().with_status(reply));
        let ledger = Arc::new(InMemoryLedger::new());
        let sender = Arc::new(sender);
        let gateway = Arc::new(GatewayClient::new(
            Arc::clone(&transport) as Arc<dyn crate::gateway::transport::GatewayTransport>,
            credentials(),
            Environment::Sandbox,
            "https://studio.example/payment/ipn",
            chrono::Duration::minutes(5),
        ));
        let notifier = NotificationDispatch::new(
            Arc::clone(&sender) as Arc<dyn NotificationSender>,
            "studio@example.com",
            "Ink Studio",
        );
        let service = ReconciliationService::new(
            gateway,
            Arc::clone(&ledger) as Arc<dyn LedgerStore>,
            notifier,
            "USD",
        );
        Harness {
            service,
            transport,
            ledger,
            sender,
        }
    }

    #[tokio::test]
    async fn completed_payment_inserts_deposit_in_minor_units() {
        let h = harness(status("Completed", 15.50), RecordingSender::default());

        let Ok(receipt) = h.service.reconcile("T1", "order_1_abc").await else {
            panic!("reconcile should succeed");
        };
        assert_eq!(receipt.ledger, LedgerSync::Inserted);
        assert_eq!(receipt.amount_minor, 1550);

        let stored = h.ledger.find_deposit("T1", None).await.ok().flatten();
        let Some(stored) = stored else {
            panic!("deposit missing");
        };
        assert_eq!(stored.amount_minor, 1550);
        assert_eq!(stored.currency, "USD");
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        assert_eq!(stored.payment_intent_id.as_deref(), Some("CONF-1"));
    }

    #[tokio::test]
    async fn second_reconcile_is_idempotent_and_quiet() {
        let h = harness(status("Completed", 10.0), RecordingSender::default());

        let first = h.service.reconcile("T1", "order_1_abc").await;
        let second = h.service.reconcile("T1", "order_1_abc").await;

        assert!(first.is_ok());
        assert_eq!(second.map(|r| r.ledger), Ok(LedgerSync::AlreadySettled));
        assert_eq!(h.ledger.deposit_count().await, 1);
        // Only the studio email of the first call: the payer account is a phone.
        assert_eq!(h.sender.recipients(), vec!["studio@example.com".to_string()]);
        // Status is queried fresh every time.
        assert_eq!(h.transport.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pending_status_leaves_ledger_untouched() {
        let h = harness(status("Pending", 10.0), RecordingSender::default());

        let result = h.service.reconcile("T1", "order_1_abc").await;
        assert_eq!(
            result,
            Err(ReconcileError::NotCompleted("Pending".to_string()))
        );
        assert_eq!(h.ledger.deposit_count().await, 0);
        assert!(h.sender.recipients().is_empty());
    }

    #[tokio::test]
    async fn failed_status_marks_pending_deposit_failed() {
        let h = harness(status("Failed", 10.0), RecordingSender::default());
        let _ = h
            .ledger
            .insert_deposit(NewDeposit {
                session_id: "T1".to_string(),
                email: Some("ada@example.com".to_string()),
                amount_minor: 1000,
                currency: "USD".to_string(),
                payment_status: PaymentStatus::Pending,
                payment_intent_id: Some("order_1_abc".to_string()),
                provider: Provider::OrderGateway,
                mode: None,
                metadata: serde_json::json!({}),
                booking_id: None,
            })
            .await;

        let result = h.service.reconcile("T1", "order_1_abc").await;
        assert!(matches!(result, Err(ReconcileError::NotCompleted(_))));

        let stored = h.ledger.find_deposit("T1", None).await.ok().flatten();
        assert_eq!(
            stored.map(|d| d.payment_status),
            Some(PaymentStatus::Failed)
        );
    }

    #[tokio::test]
    async fn blank_identifiers_are_rejected() {
        let h = harness(status("Completed", 10.0), RecordingSender::default());
        assert!(matches!(
            h.service.reconcile("", "order_1").await,
            Err(ReconcileError::Validation(_))
        ));
        assert!(matches!(
            h.service.reconcile("T1", "  ").await,
            Err(ReconcileError::Validation(_))
        ));
        assert_eq!(h.transport.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn booking_contact_is_preferred_and_customer_failure_is_isolated() {
        let h = harness(
            status("Completed", 10.0),
            RecordingSender {
                fail_for: vec!["ada@example.com".to_string()],
                ..RecordingSender::default()
            },
        );
        let Ok(booking) = h
            .ledger
            .insert_booking(crate::domain::NewBooking {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                placement: "arm".to_string(),
                size: "small".to_string(),
                details: "fern".to_string(),
                ..crate::domain::NewBooking::default()
            })
            .await
        else {
            panic!("booking insert failed");
        };
        let reference = format!("booking_{}_1700000000000", booking.id);

        let Ok(receipt) = h.service.reconcile("T1", &reference).await else {
            panic!("reconcile should succeed despite the customer email failing");
        };
        assert_eq!(receipt.customer_name, "Ada");
        assert_eq!(receipt.customer_email, "ada@example.com");
        assert_eq!(receipt.booking_id, Some(booking.id));
        assert_eq!(h.sender.recipients(), vec!["studio@example.com".to_string()]);
    }

    #[tokio::test]
    async fn racing_triggers_converge_on_one_row() {
        let h = harness(status("Completed", 10.0), RecordingSender::default());

        let (a, b) = tokio::join!(
            h.service.reconcile("T1", "order_1_abc"),
            h.service.reconcile("T1", "order_1_abc")
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(h.ledger.deposit_count().await, 1);
        let inserts = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Ok(receipt) if receipt.ledger == LedgerSync::Inserted))
            .count();
        assert_eq!(inserts, 1);
    }

    /// Ledger whose every call fails, as when the database is down.
    #[derive(Debug)]
    struct UnavailableLedger;

    fn down() -> crate::persistence::LedgerError {
        crate::persistence::LedgerError::Database("connection refused".to_string())
    }

    #[async_trait::async_trait]
    impl LedgerStore for UnavailableLedger {
        async fn insert_booking(
            &self,
            _booking: crate::domain::NewBooking,
        ) -> Result<Booking, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn get_booking(
            &self,
            _id: BookingId,
        ) -> Result<Option<Booking>, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn list_bookings(
            &self,
            _filter: &crate::persistence::ListFilter,
        ) -> Result<Vec<Booking>, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn insert_deposit(
            &self,
            _deposit: NewDeposit,
        ) -> Result<crate::domain::Deposit, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn get_deposit(
            &self,
            _id: crate::domain::DepositId,
        ) -> Result<Option<crate::domain::Deposit>, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn find_deposit(
            &self,
            _session_id: &str,
            _reference: Option<&str>,
        ) -> Result<Option<crate::domain::Deposit>, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn transition_deposit(
            &self,
            _id: crate::domain::DepositId,
            _from: &[PaymentStatus],
            _change: &DepositChange,
        ) -> Result<Option<crate::domain::Deposit>, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn list_deposits(
            &self,
            _filter: &crate::persistence::ListFilter,
        ) -> Result<Vec<crate::domain::Deposit>, crate::persistence::LedgerError> {
            Err(down())
        }

        async fn deposits_for_booking(
            &self,
            _id: BookingId,
        ) -> Result<Vec<crate::domain::Deposit>, crate::persistence::LedgerError> {
            Err(down())
        }
    }

    #[tokio::test]
    async fn confirmed_payment_survives_ledger_outage() {
        let transport = Arc::new(MockTransport::new().with_status(StatusResponse {
            payment_account: Some("a@b.com".to_string()),
            ..status("Completed", 10.0)
        }));
        let sender = Arc::new(RecordingSender::default());
        let gateway = Arc::new(GatewayClient::new(
            Arc::clone(&transport) as Arc<dyn crate::gateway::transport::GatewayTransport>,
            credentials(),
            Environment::Sandbox,
            "https://studio.example/payment/ipn",
            chrono::Duration::minutes(5),
        ));
        let service = ReconciliationService::new(
            gateway,
            Arc::new(UnavailableLedger),
            NotificationDispatch::new(
                Arc::clone(&sender) as Arc<dyn NotificationSender>,
                "studio@example.com",
                "Ink Studio",
            ),
            "USD",
        );

        let Ok(receipt) = service.reconcile("T1", "order_1_abc").await else {
            panic!("a confirmed payment must not fail on the ledger");
        };
        assert_eq!(receipt.ledger, LedgerSync::Deferred);
        assert_eq!(receipt.deposit_id, None);
        assert_eq!(receipt.amount_minor, 1000);
        assert_eq!(
            sender.recipients(),
            vec!["a@b.com".to_string(), "studio@example.com".to_string()]
        );
    }

    #[test]
    fn parses_booking_reference() {
        let id = BookingId::new();
        assert_eq!(
            booking_from_reference(&format!("booking_{id}_1700000000000")),
            Some(id)
        );
        assert_eq!(booking_from_reference("order_1700000000000_abc123xyz"), None);
        assert_eq!(booking_from_reference("booking_not-a-uuid_1"), None);
    }

    #[test]
    fn outcome_is_tagged() {
        let failed = ReconcileOutcome::from(Err(ReconcileError::NotCompleted(
            "Pending".to_string(),
        )));
        let json = serde_json::to_value(&failed).unwrap_or_default();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "payment not completed: Pending");
        assert!(json.get("paymentDetails").is_none());
    }
}
